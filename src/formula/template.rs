// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Line-oriented formula language.
//!
//! ```text
//! # one draw command per line
//! box size=0.5,0.5,0.5 color={Color}
//! set label_offset=0,0.6,0
//! text content="{Name} ({@name})" offset=var:label_offset
//! ```
//!
//! `{Attribute}` interpolates an attribute value (or `{@name}` / `{@id}` for the instance),
//! `var:<name>` reads a custom variable and `set` assigns derived custom variables.

use super::{placeholder_regex, EvalScope, Formula, FormulaError, FormulaEvaluator};
use crate::model::{AttributeValue, DrawCommand, Vec3, Visual};

const DRAW_COMMANDS: &[&str] = &[
    "box", "sphere", "cylinder", "plane", "text", "line", "model", "image", "group",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEvaluator;

impl FormulaEvaluator for TemplateEvaluator {
    fn evaluate(&self, formula: &Formula, scope: &mut EvalScope) -> Result<Visual, FormulaError> {
        let mut visual = Visual::default();

        for (index, raw_line) in formula.source().lines().enumerate() {
            let line = index + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (command, rest) = trimmed
                .split_once(char::is_whitespace)
                .unwrap_or((trimmed, ""));
            let params = tokenize_params(rest, line)?;

            if command == "set" {
                for (key, raw) in params {
                    let value = resolve_value(&raw, scope)?;
                    scope.set_variable(key, value);
                }
                continue;
            }

            if !DRAW_COMMANDS.contains(&command) {
                return Err(FormulaError::UnknownCommand {
                    line,
                    command: command.to_owned(),
                });
            }

            let mut draw = DrawCommand::new(command);
            for (key, raw) in params {
                let value = resolve_value(&raw, scope)?;
                draw.params.insert(key.into(), value);
            }
            visual.commands.push(draw);
        }

        Ok(visual)
    }
}

#[derive(Debug, PartialEq)]
enum RawValue {
    Quoted(String),
    Bare(String),
}

fn tokenize_params(rest: &str, line: usize) -> Result<Vec<(String, RawValue)>, FormulaError> {
    let mut params = Vec::new();
    let mut chars = rest.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        if chars.next() != Some('=') || key.is_empty() {
            return Err(FormulaError::Malformed {
                line,
                reason: format!("expected key=value, found {key:?}"),
            });
        }

        let value = if chars.next_if_eq(&'"').is_some() {
            let mut text = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            text.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    other => text.push(other),
                }
            }
            if !closed {
                return Err(FormulaError::Malformed {
                    line,
                    reason: format!("unterminated string for {key:?}"),
                });
            }
            RawValue::Quoted(text)
        } else {
            let mut text = String::new();
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                text.push(c);
            }
            RawValue::Bare(text)
        };

        params.push((key, value));
    }

    Ok(params)
}

fn resolve_value(raw: &RawValue, scope: &EvalScope) -> Result<AttributeValue, FormulaError> {
    match raw {
        RawValue::Quoted(text) => Ok(AttributeValue::Text(interpolate(text, scope)?)),
        RawValue::Bare(text) => {
            if let Some(name) = text.strip_prefix("var:") {
                return Ok(scope.variable(name).cloned().unwrap_or_default());
            }
            if let Some(key) = text.strip_prefix("attr:") {
                return lookup(key, scope).cloned();
            }
            if let Some(whole) = text
                .strip_prefix('{')
                .and_then(|t| t.strip_suffix('}'))
                .filter(|t| !t.contains(['{', '}']))
            {
                return placeholder(whole.trim(), scope);
            }
            Ok(parse_literal(&interpolate(text, scope)?))
        }
    }
}

fn lookup<'a>(key: &str, scope: &'a EvalScope) -> Result<&'a AttributeValue, FormulaError> {
    scope
        .attribute(key)
        .ok_or_else(|| FormulaError::UnknownAttribute {
            name: key.to_owned(),
        })
}

fn placeholder(name: &str, scope: &EvalScope) -> Result<AttributeValue, FormulaError> {
    match name {
        "@name" => Ok(AttributeValue::Text(scope.instance_name().to_owned())),
        "@id" => Ok(AttributeValue::Text(scope.instance_id().to_string())),
        _ => lookup(name, scope).cloned(),
    }
}

fn interpolate(text: &str, scope: &EvalScope) -> Result<String, FormulaError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in placeholder_regex().captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&placeholder(name.as_str().trim(), scope)?.to_string());
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn parse_literal(text: &str) -> AttributeValue {
    match text {
        "true" => return AttributeValue::Bool(true),
        "false" => return AttributeValue::Bool(false),
        "" => return AttributeValue::Null,
        _ => {}
    }
    if let Ok(value) = text.parse::<i64>() {
        return AttributeValue::Integer(value);
    }
    if let Ok(value) = text.parse::<f64>() {
        return AttributeValue::Float(value);
    }
    let parts = text.split(',').map(|p| p.trim().parse::<f64>()).collect::<Vec<_>>();
    if let [Ok(x), Ok(y), Ok(z)] = parts.as_slice() {
        return AttributeValue::Vector(Vec3::new(*x, *y, *z));
    }
    AttributeValue::Text(text.to_owned())
}
