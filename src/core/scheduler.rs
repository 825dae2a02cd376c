use std::rc::Rc;

use crate::core::System;

struct Event {
    time: u64,
    info: Rc<EventInfo>,
}

pub struct EventInfo {
    name: String,
    id: usize,
    callback: fn(&mut System),
}

impl EventInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn callback(&self) -> fn(&mut System) {
        self.callback
    }
}

impl Default for EventInfo {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            id: usize::MAX,
            callback: |_| unreachable!(),
        }
    }
}

#[derive(Default)]
pub struct Scheduler {
    events: Vec<Event>,
    current_time: u64,
    current_event_id: usize,
    // due time of the event most recently handed out by `pop_due`
    dispatch_time: u64,
}

impl Scheduler {
    pub fn reset(&mut self) {
        self.events.clear();
        self.current_time = 0;
        self.dispatch_time = 0;
    }

    pub fn tick(&mut self, cycles: u64) {
        self.current_time += cycles;
    }

    /// Removes the earliest event that is due, if any.
    ///
    /// The caller is expected to invoke the returned callback; periodic events
    /// added from inside that callback are anchored to this event's due time.
    pub fn pop_due(&mut self) -> Option<Rc<EventInfo>> {
        match self.events.first() {
            Some(event) if event.time <= self.current_time => {
                let event = self.events.remove(0);
                self.dispatch_time = event.time;
                Some(event.info)
            }
            _ => None,
        }
    }

    pub fn add_event(&mut self, delay: u64, info: &Rc<EventInfo>) {
        self.insert(self.current_time + delay, info);
    }

    /// Schedules relative to the due time of the event being dispatched rather
    /// than the current time, so late dispatch never accumulates.
    pub fn add_periodic_event(&mut self, delay: u64, info: &Rc<EventInfo>) {
        self.insert(self.dispatch_time + delay, info);
    }

    pub fn cancel_event(&mut self, info: &EventInfo) {
        self.events.retain(|e| e.info.id != info.id);
    }

    pub fn register_event(&mut self, name: &str, callback: fn(&mut System)) -> Rc<EventInfo> {
        let info = EventInfo {
            name: name.to_string(),
            id: self.current_event_id,
            callback,
        };
        self.current_event_id += 1;
        Rc::new(info)
    }

    pub fn get_current_time(&self) -> u64 {
        self.current_time
    }

    pub fn set_current_time(&mut self, time: u64) {
        self.current_time = time;
    }

    pub fn get_event_time(&self) -> u64 {
        self.events.first().map(|e| e.time).unwrap_or(u64::MAX)
    }

    /// Due time of the pending occurrence of `info`, if one is scheduled.
    pub fn find_event(&self, info: &EventInfo) -> Option<u64> {
        self.events.iter().find(|e| e.info.id == info.id).map(|e| e.time)
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    fn insert(&mut self, time: u64, info: &Rc<EventInfo>) {
        // events with equal time keep their insertion order
        let index = self.events.partition_point(|e| e.time <= time);
        self.events.insert(
            index,
            Event {
                time,
                info: info.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_ordered_by_time() {
        let mut scheduler = Scheduler::default();
        let late = scheduler.register_event("late", |_| {});
        let early = scheduler.register_event("early", |_| {});

        scheduler.add_event(200, &late);
        scheduler.add_event(100, &early);
        assert_eq!(scheduler.get_event_time(), 100);

        scheduler.tick(150);
        assert_eq!(scheduler.pop_due().map(|e| e.name().to_string()), Some("early".into()));
        assert!(scheduler.pop_due().is_none());

        scheduler.tick(50);
        assert_eq!(scheduler.pop_due().map(|e| e.name().to_string()), Some("late".into()));
        assert_eq!(scheduler.get_event_time(), u64::MAX);
    }

    #[test]
    fn periodic_events_anchor_to_dispatch_time() {
        let mut scheduler = Scheduler::default();
        let event = scheduler.register_event("periodic", |_| {});

        scheduler.add_event(100, &event);
        scheduler.tick(130);
        let info = scheduler.pop_due().unwrap();
        scheduler.add_periodic_event(100, &info);
        assert_eq!(scheduler.find_event(&event), Some(200));

        scheduler.add_event(100, &event);
        assert_eq!(scheduler.pending(), 2);
        scheduler.cancel_event(&event);
        assert_eq!(scheduler.pending(), 0);
    }
}
