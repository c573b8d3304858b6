//! The scheduler loop (component G) and the node-facing API (component H),
//! implemented directly on `Simulator` so a callback can be handed
//! `&mut Simulator` typed as `&mut dyn NodeContext` (§9 Design Notes:
//! "model this as a context handle ... valid only inside a callback").

use std::collections::{BinaryHeap, HashMap};
use std::io::Write;
use std::panic::AssertUnwindSafe;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, trace};

use netsim_core::{DeadTimerError, Link, LinkSnapshot, Node, NodeContext, NodeEvent, NodeEventKind, TimerSlot};

use crate::error::SimFault;
use crate::node_state::NodeState;
use crate::queue::{FrameDeliveryEntry, TimerEntry};
use crate::rng::{poisson_usec, seeded_rng};
use crate::stats::{Counters, StatsSink};

struct TimerRecord {
    node_index: usize,
    slot: TimerSlot,
    data: Option<Vec<u8>>,
}

/// What a scheduler iteration did (§4.G step 2/7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Done,
}

pub struct Simulator {
    now_usec: u64,
    duration_usec: Option<u64>,

    event_queue: BinaryHeap<FrameDeliveryEntry>,
    event_seq: u64,

    timer_queue: BinaryHeap<TimerEntry>,
    timer_map: HashMap<u64, TimerRecord>,
    timer_counter: u64,

    nodes: Vec<NodeState>,
    links: Vec<Link>,
    app_enabled: Vec<usize>,

    current_node: Option<usize>,
    rng: StdRng,

    counters: Counters,
    stats_period_usec: u64,
    next_stats_usec: Option<u64>,
    stats_sink: Option<StatsSink>,

    node_output: Box<dyn Write + Send>,
    silent_nodes: bool,
}

impl Simulator {
    pub fn new(
        nodes: Vec<NodeState>,
        links: Vec<Link>,
        seed: Option<u64>,
        duration_usec: Option<u64>,
        stats_period_usec: u64,
        stats_sink: Option<StatsSink>,
        node_output: Box<dyn Write + Send>,
        silent_nodes: bool,
    ) -> Self {
        Self {
            now_usec: 0,
            duration_usec,
            event_queue: BinaryHeap::new(),
            event_seq: 0,
            timer_queue: BinaryHeap::new(),
            timer_map: HashMap::new(),
            timer_counter: 0,
            nodes,
            links,
            app_enabled: Vec::new(),
            current_node: None,
            rng: seeded_rng(seed),
            counters: Counters::default(),
            stats_period_usec,
            next_stats_usec: Some(stats_period_usec),
            stats_sink,
            node_output,
            silent_nodes,
        }
    }

    pub fn current_time_usec(&self) -> u64 {
        self.now_usec
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn node_name(&self, index: usize) -> &str {
        &self.nodes[index].name
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Invoke `Reboot` on every node once, in index order (§4.H, §6 "Node
    /// callback contract"). Must run before the first `step`. A panic inside
    /// one node's `Reboot` handler is reported and does not stop the others
    /// from booting (§7: Reboot failures are non-fatal).
    pub fn boot(&mut self) -> Result<(), SimFault> {
        for index in 0..self.nodes.len() {
            self.call_node_handler(index, NodeEvent::Reboot)?;
        }
        Ok(())
    }

    /// Run until the scheduler reports `Done`.
    pub fn run_to_completion(&mut self) -> Result<(), SimFault> {
        while self.step()? == StepOutcome::Continue {}
        Ok(())
    }

    /// One scheduler iteration (§4.G).
    pub fn step(&mut self) -> Result<StepOutcome, SimFault> {
        let app_pick = self.next_application_pick();
        let app_time = app_pick.map(|(t, _)| t);
        let event_time = self.event_queue.peek().map(|e| e.time);
        let timer_time = self.timer_queue.peek().map(|e| e.time);
        let stats_time = self.next_stats_usec;

        let earliest = [app_time, event_time, timer_time, stats_time]
            .into_iter()
            .flatten()
            .min();

        let Some(earliest) = earliest else {
            return Ok(StepOutcome::Done);
        };

        if let Some(cap) = self.duration_usec {
            if earliest > cap {
                self.now_usec = cap;
                return Ok(StepOutcome::Done);
            }
        }

        if earliest < self.now_usec {
            return Err(SimFault::TimeRunningBackwards {
                now: self.now_usec,
                earliest,
            });
        }
        self.now_usec = earliest;

        if app_time == Some(earliest) {
            let (_, sender) = app_pick.expect("app_time implies app_pick");
            self.generate_application_message(sender)?;
        } else if event_time == Some(earliest) {
            self.dispatch_frame_delivery()?;
        } else if timer_time == Some(earliest) {
            self.dispatch_timer()?;
        } else {
            self.dispatch_stats_tick();
        }

        Ok(StepOutcome::Continue)
    }

    /// Component F: pick the application-enabled node with the earliest
    /// upcoming send time, drawing a fresh Poisson delay for any node whose
    /// stored next-send time has already elapsed.
    fn next_application_pick(&mut self) -> Option<(u64, usize)> {
        let now = self.now_usec;
        let mut earliest: Option<(u64, usize)> = None;

        for &index in &self.app_enabled {
            let node = &mut self.nodes[index];
            let due = node
                .next_message_usec
                .map(|t| t < now)
                .unwrap_or(true);
            if due {
                node.next_message_usec = Some(now + poisson_usec(&mut self.rng, node.messagerate_usec));
            }
            let candidate = node.next_message_usec.expect("just set above");

            match earliest {
                Some((best, _)) if candidate >= best => {}
                _ => earliest = Some((candidate, index)),
            }
        }

        earliest
    }

    fn generate_application_message(&mut self, sender: usize) -> Result<(), SimFault> {
        let destinations = self.nodes[sender].application_destinations.clone();
        if destinations.is_empty() {
            // Disabled mid-flight by a handler invoked earlier this tick;
            // nothing to send, regeneration happens next time it's polled.
            return Ok(());
        }

        let destination = destinations[self.rng.random_range(0..destinations.len())];

        let mut payload = vec![0u8; 50];
        rand::rng().fill(payload.as_mut_slice());

        self.counters.events_raised += 1;
        self.call_node_handler(
            sender,
            NodeEvent::ApplicationReady {
                destination,
                payload: payload.clone(),
            },
        )?;

        self.counters.messages_generated += 1;
        self.nodes[destination]
            .application_waiting
            .insert(payload, self.now_usec);
        self.nodes[sender].next_message_usec = None;

        Ok(())
    }

    fn dispatch_frame_delivery(&mut self) -> Result<(), SimFault> {
        let entry = self.event_queue.pop().expect("event_time implied a head");
        for receiver in entry.receivers {
            let link_index = self.nodes[receiver]
                .links
                .iter()
                .position(|&id| id == entry.link_id)
                .ok_or(SimFault::ReceivingNodeMissingLink { node: receiver })?;

            self.counters.events_raised += 1;
            self.counters.frames_received += 1;
            self.counters.bytes_rx_physical += entry.frame.len() as u64;

            self.call_node_handler(
                receiver,
                NodeEvent::PhysicalReady {
                    link_index,
                    frame: entry.frame.clone(),
                },
            )?;
        }
        Ok(())
    }

    fn dispatch_timer(&mut self) -> Result<(), SimFault> {
        let entry = self.timer_queue.pop().expect("timer_time implied a head");
        let Some(record) = self.timer_map.remove(&entry.timer_id) else {
            // Soft-cancelled tombstone (§3 invariant 4): silently dropped.
            return Ok(());
        };

        self.counters.events_raised += 1;
        self.call_node_handler(
            record.node_index,
            NodeEvent::Timer {
                slot: record.slot,
                timer_id: entry.timer_id,
            },
        )
    }

    fn dispatch_stats_tick(&mut self) {
        let now = self.now_usec;
        match &mut self.stats_sink {
            Some(sink) => {
                sink.write_row(now, &self.counters)
                    .expect("stats CSV sink write failed");
                self.next_stats_usec = Some(now + self.stats_period_usec);
            }
            None => {
                // No sink configured: this single tick exists only to
                // self-cancel (mirrors the original `sim.py`, which always
                // arms a next-tick timestamp even without `--stats-csv`).
                self.next_stats_usec = None;
            }
        }
    }

    fn push_frame_delivery(&mut self, time: u64, frame: Vec<u8>, link_id: usize, receivers: Vec<usize>) {
        self.event_queue.push(FrameDeliveryEntry {
            time,
            seq: self.event_seq,
            frame,
            link_id,
            receivers,
        });
        self.event_seq += 1;
    }

    /// Component H dispatch: take the implementation out, hand `self` to it
    /// as `&mut dyn NodeContext`, catch any panic, and put it back. `Reboot`
    /// always fires; other kinds only if the node registered interest.
    fn call_node_handler(&mut self, node_index: usize, event: NodeEvent) -> Result<(), SimFault> {
        if self.current_node.is_some() {
            return Err(SimFault::RecursiveDispatch { node: node_index });
        }

        let kind = event.kind();
        if kind != NodeEventKind::Reboot && !self.nodes[node_index].registered.contains(&kind) {
            return Ok(());
        }

        debug!(node = node_index, ?kind, time = self.now_usec, "dispatch");

        let mut implementation = self.nodes[node_index]
            .implementation
            .take()
            .expect("node implementation missing; concurrent dispatch?");

        self.current_node = Some(node_index);
        let event_name = event_kind_name(kind);
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            implementation.on_event(self, event);
        }));
        self.current_node = None;
        self.nodes[node_index].implementation = Some(implementation);

        match outcome {
            Ok(()) => Ok(()),
            Err(payload) => {
                let message = panic_message(payload);
                if kind == NodeEventKind::Reboot {
                    // §7: Reboot failures are reported but non-fatal, mirroring
                    // `boot_nodes`'s per-node try/except in the original simulator.
                    tracing::error!(node = node_index, event = event_name, %message, "node REBOOT handler panicked");
                    Ok(())
                } else {
                    Err(SimFault::NodeHandlerPanicked { node: node_index, event: event_name, message })
                }
            }
        }
    }
}

fn event_kind_name(kind: NodeEventKind) -> &'static str {
    match kind {
        NodeEventKind::Reboot => "REBOOT",
        NodeEventKind::PhysicalReady => "PHYSICALREADY",
        NodeEventKind::ApplicationReady => "APPLICATIONREADY",
        NodeEventKind::Timer(TimerSlot::T0) => "TIMER0",
        NodeEventKind::Timer(TimerSlot::T1) => "TIMER1",
        NodeEventKind::Timer(TimerSlot::T2) => "TIMER2",
        NodeEventKind::Timer(TimerSlot::T3) => "TIMER3",
        NodeEventKind::Timer(TimerSlot::T4) => "TIMER4",
        NodeEventKind::Timer(TimerSlot::T5) => "TIMER5",
        NodeEventKind::Timer(TimerSlot::T6) => "TIMER6",
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "node handler panicked with a non-string payload".to_string()
    }
}

impl NodeContext for Simulator {
    fn now(&self) -> u64 {
        self.now_usec
    }

    fn link_info(&self, link_index: usize) -> Option<LinkSnapshot> {
        let node_index = self.current_node.expect("link_info called outside a callback");
        self.nodes[node_index]
            .link_infos
            .get(link_index)
            .map(LinkSnapshot::from)
    }

    fn enable_application(&mut self, target: Option<usize>) {
        let current = self.current_node.expect("enable_application called outside a callback");
        match target {
            None => {
                for i in 0..self.nodes.len() {
                    self.enable_application_one(current, i);
                }
            }
            Some(t) => self.enable_application_one(current, t),
        }
    }

    fn disable_application(&mut self, target: Option<usize>) {
        let current = self.current_node.expect("disable_application called outside a callback");
        match target {
            None => {
                for i in 0..self.nodes.len() {
                    self.disable_application_one(current, i);
                }
            }
            Some(t) => self.disable_application_one(current, t),
        }
    }

    fn start_timer(&mut self, slot: TimerSlot, delay_usec: i64, data: Option<Vec<u8>>) -> u64 {
        let node_index = self.current_node.expect("start_timer called outside a callback");
        assert!(delay_usec >= 0, "timer delay must be non-negative, got {delay_usec}");

        self.timer_counter += 1;
        let id = self.timer_counter;
        let fire_time = self.now_usec + delay_usec as u64;

        self.timer_map.insert(id, TimerRecord { node_index, slot, data });
        self.timer_queue.push(TimerEntry { time: fire_time, timer_id: id });
        id
    }

    fn stop_timer(&mut self, id: u64) -> bool {
        self.timer_map.remove(&id).is_some()
    }

    fn timer_data(&self, id: u64) -> Result<Option<Vec<u8>>, DeadTimerError> {
        self.timer_map
            .get(&id)
            .map(|r| r.data.clone())
            .ok_or(DeadTimerError)
    }

    fn set_handler(&mut self, kind: NodeEventKind) {
        let node_index = self.current_node.expect("set_handler called outside a callback");
        self.nodes[node_index].registered.insert(kind);
    }

    fn write_physical(&mut self, link_index: usize, frame: Vec<u8>) -> bool {
        let node_index = self.current_node.expect("write_physical called outside a callback");

        if link_index >= self.nodes[node_index].links.len() {
            return false;
        }

        let link_id = self.nodes[node_index].links[link_index];
        let info = self.nodes[node_index].link_infos[link_index].clone();

        if !info.up {
            return false;
        }

        self.counters.frames_transmitted += 1;

        if let Some(denom) = info.loss_denominator(None) {
            if self.rng.random_range(0..denom) == 0 {
                trace!(node = node_index, link = link_index, "frame lost");
                return true;
            }
        }

        let mut frame = frame;
        if let Some(denom) = info.corrupt_denominator(None) {
            let should_corrupt = self.rng.random_range(0..denom) == 0;
            if should_corrupt && frame.len() >= 3 {
                let offset = self.rng.random_range(0..frame.len() - 2);
                frame[offset] = !frame[offset];
                frame[offset + 1] = !frame[offset + 1];
                trace!(node = node_index, link = link_index, offset, "frame corrupted");
            }
        }

        let serialization_delay = if info.bandwidth_bps > 0 {
            (frame.len() as u64 * 8 * 1_000_000) / info.bandwidth_bps
        } else {
            0
        };
        let delivery_time = self.now_usec + serialization_delay + info.propagation_delay_usec;

        let receivers = self.links[link_id].receivers(node_index);
        if !receivers.is_empty() {
            self.push_frame_delivery(delivery_time, frame, link_id, receivers);
        }

        true
    }

    fn write_application(&mut self, payload: Vec<u8>) -> bool {
        let node_index = self.current_node.expect("write_application called outside a callback");
        let Some(sent_time) = self.nodes[node_index].application_waiting.remove(&payload) else {
            return false;
        };

        let elapsed = self.now_usec - sent_time;
        self.counters.total_delivery_time_usec += elapsed;
        self.counters.messages_delivered += 1;
        self.counters.bytes_rx_application += payload.len() as u64;
        true
    }

    fn print(&mut self, message: &str) {
        let current = self.current_node.expect("print called outside a callback");
        if self.silent_nodes {
            return;
        }
        writeln!(self.node_output, "[{current}]: {message}").expect("node-output sink write failed");
    }
}

impl Simulator {
    fn enable_application_one(&mut self, current: usize, target: usize) {
        if current == target {
            return; // §9 Open Question: a node never sends to itself.
        }
        let node = &mut self.nodes[current];
        if !node.application_destinations.contains(&target) {
            node.application_destinations.push(target);
            node.application_enabled = true;
            if !self.app_enabled.contains(&current) {
                self.app_enabled.push(current);
                self.app_enabled.sort_unstable();
            }
        }
    }

    fn disable_application_one(&mut self, current: usize, target: usize) {
        if current == target {
            return;
        }
        let node = &mut self.nodes[current];
        if let Some(pos) = node.application_destinations.iter().position(|&d| d == target) {
            node.application_destinations.remove(pos);
            if node.application_destinations.is_empty() {
                node.application_enabled = false;
                self.app_enabled.retain(|&i| i != current);
            }
        }
    }
}
