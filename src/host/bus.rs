// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use log::trace;
use tokio::sync::broadcast;

use super::{EditorEvent, EventBus};

const DEFAULT_CAPACITY: usize = 64;

/// Fan-out event bus on a broadcast channel.
///
/// Publishing never blocks; with no subscriber the event is dropped. A subscriber that falls
/// more than `capacity` events behind sees a lag error and skips ahead.
#[derive(Debug, Clone)]
pub struct ChannelBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl ChannelBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus for ChannelBus {
    fn publish(&self, event: EditorEvent) {
        trace!(event:? = event; "publish");
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;

    use super::ChannelBus;
    use crate::host::{EditorEvent, EventBus};

    #[test]
    fn every_subscriber_sees_every_event_in_order() {
        let bus = ChannelBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(EditorEvent::SceneListChanged);
        bus.publish(EditorEvent::AttributePanelRefresh { update: true });

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.try_recv(), Ok(EditorEvent::SceneListChanged));
            assert_eq!(
                rx.try_recv(),
                Ok(EditorEvent::AttributePanelRefresh { update: true })
            );
            assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        }
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = ChannelBus::new(1);
        bus.publish(EditorEvent::SceneListChanged);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
