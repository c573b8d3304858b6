//! Stop-and-wait data-link protocol with piggybacked acknowledgments.
//! Tanenbaum's "protocol 4" (2nd edition, p227): a data frame carries the
//! receiver's own pending ACK in its `ack` field whenever one is due, and
//! falls back to an explicit ACK frame after a short delay otherwise.
//!
//! This is a two-node protocol: link index 1 (the first non-loopback link)
//! is the only link it ever writes to.

use netsim_checksum::checksum_ccitt;
use netsim_core::{Node, NodeContext, NodeEvent, NodeEventKind, TimerSlot};

const DATA_LINK: usize = 1;
const ACK_DELAY_USEC: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
enum FrameKind {
    Data = 0,
    Ack = 1,
}

impl FrameKind {
    fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(FrameKind::Data),
            1 => Some(FrameKind::Ack),
            _ => None,
        }
    }
}

/// On-wire frame: `kind`, `checksum`, `seq`, `ack` as big-endian `u16`s,
/// followed by the raw message bytes. The checksum covers the whole frame
/// with the checksum field itself zeroed.
struct Frame {
    kind: FrameKind,
    checksum: u16,
    seq: u16,
    ack: u16,
    msg: Vec<u8>,
}

impl Frame {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.msg.len());
        out.extend_from_slice(&(self.kind as u16).to_be_bytes());
        out.extend_from_slice(&self.checksum.to_be_bytes());
        out.extend_from_slice(&self.seq.to_be_bytes());
        out.extend_from_slice(&self.ack.to_be_bytes());
        out.extend_from_slice(&self.msg);
        out
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 8 {
            return None;
        }
        let kind = FrameKind::from_u16(u16::from_be_bytes([bytes[0], bytes[1]]))?;
        let checksum = u16::from_be_bytes([bytes[2], bytes[3]]);
        let seq = u16::from_be_bytes([bytes[4], bytes[5]]);
        let ack = u16::from_be_bytes([bytes[6], bytes[7]]);
        Some(Frame { kind, checksum, seq, ack, msg: bytes[8..].to_vec() })
    }
}

pub struct StopAndWaitNode {
    last_msg: Option<Vec<u8>>,
    data_timer: Option<u64>,
    ack_timer: Option<u64>,
    ack_expected: u16,
    next_frame_to_send: u16,
    frame_expected: u16,
    ack_pending: bool,
    pending_ack_seq: u16,
}

impl Default for StopAndWaitNode {
    fn default() -> Self {
        Self {
            last_msg: None,
            data_timer: None,
            ack_timer: None,
            ack_expected: 0,
            next_frame_to_send: 0,
            frame_expected: 0,
            ack_pending: false,
            pending_ack_seq: 0,
        }
    }
}

impl StopAndWaitNode {
    fn transmit_frame(&mut self, ctx: &mut dyn NodeContext, msg: Vec<u8>, kind: FrameKind, seqno: u16) {
        let ack = if self.ack_pending && kind == FrameKind::Data {
            let seq = self.pending_ack_seq;
            self.ack_pending = false;
            if let Some(id) = self.ack_timer.take() {
                ctx.stop_timer(id);
            }
            ctx.print(&format!("Piggybacking ACK, seq={seq}"));
            seq
        } else if kind == FrameKind::Ack {
            seqno
        } else {
            0
        };

        let mut frame = Frame { kind, checksum: 0, seq: seqno, ack, msg };
        let on_wire = frame.encode();
        frame.checksum = checksum_ccitt(&on_wire);
        let packed = frame.encode();
        let frame_len = packed.len();
        ctx.write_physical(DATA_LINK, packed);

        match kind {
            FrameKind::Ack => ctx.print(&format!("ACK transmitted, seq={seqno}")),
            FrameKind::Data => {
                ctx.print(&format!("DATA transmitted, seq={seqno}"));
                let timeout = self.retransmit_timeout(ctx, frame_len);
                self.data_timer = Some(ctx.start_timer(TimerSlot::T1, 3 * timeout, None));
            }
        }
    }

    fn retransmit_timeout(&self, ctx: &mut dyn NodeContext, frame_len: usize) -> i64 {
        let Some(link) = ctx.link_info(DATA_LINK) else {
            return ACK_DELAY_USEC;
        };
        let serialization = if link.bandwidth_bps > 0 {
            (frame_len as u64 * 8 * 1_000_000) / link.bandwidth_bps
        } else {
            0
        };
        (serialization + link.propagation_delay_usec) as i64
    }
}

impl Node for StopAndWaitNode {
    fn on_event(&mut self, ctx: &mut dyn NodeContext, event: NodeEvent) {
        match event {
            NodeEvent::Reboot => {
                ctx.set_handler(NodeEventKind::ApplicationReady);
                ctx.set_handler(NodeEventKind::PhysicalReady);
                ctx.set_handler(NodeEventKind::Timer(TimerSlot::T1));
                ctx.set_handler(NodeEventKind::Timer(TimerSlot::T2));
                ctx.enable_application(None);
            }

            NodeEvent::ApplicationReady { payload, .. } => {
                self.last_msg = Some(payload.clone());
                ctx.disable_application(None);
                ctx.print(&format!("Down from application, seq={}", self.next_frame_to_send));
                let seq = self.next_frame_to_send;
                self.transmit_frame(ctx, payload, FrameKind::Data, seq);
                self.next_frame_to_send = 1 - self.next_frame_to_send;
            }

            NodeEvent::PhysicalReady { frame, .. } => {
                let Some(mut incoming) = Frame::decode(&frame) else {
                    ctx.print("malformed frame ignored");
                    return;
                };
                let received_checksum = incoming.checksum;
                incoming.checksum = 0;
                let recomputed = checksum_ccitt(&incoming.encode());
                if received_checksum != recomputed {
                    ctx.print("BAD checksum - frame ignored");
                    return;
                }

                match incoming.kind {
                    FrameKind::Data => {
                        if incoming.ack == self.ack_expected {
                            ctx.print(&format!("Received piggybacked ACK, seq={}", incoming.ack));
                            if let Some(id) = self.data_timer.take() {
                                ctx.stop_timer(id);
                            }
                            self.ack_expected = 1 - self.ack_expected;
                            ctx.enable_application(None);
                        }

                        let seq = incoming.seq;
                        let result = if seq == self.frame_expected {
                            ctx.write_application(incoming.msg);
                            self.frame_expected = 1 - self.frame_expected;

                            self.ack_pending = true;
                            self.pending_ack_seq = seq;
                            if let Some(id) = self.ack_timer.take() {
                                ctx.stop_timer(id);
                            }
                            self.ack_timer =
                                Some(ctx.start_timer(TimerSlot::T2, ACK_DELAY_USEC, Some(vec![seq as u8])));
                            "up to application"
                        } else {
                            "ignored"
                        };
                        ctx.print(&format!("DATA received, seq={seq}, {result}"));
                    }
                    FrameKind::Ack => {
                        if incoming.ack == self.ack_expected {
                            ctx.print(&format!("ACK received, seq={}", incoming.ack));
                            if let Some(id) = self.data_timer.take() {
                                ctx.stop_timer(id);
                            }
                            self.ack_expected = 1 - self.ack_expected;
                            ctx.enable_application(None);
                        }
                    }
                }
            }

            NodeEvent::Timer { slot: TimerSlot::T1, .. } => {
                ctx.print(&format!("Data timeout, retransmitting seq={}", self.ack_expected));
                if let Some(msg) = self.last_msg.clone() {
                    let seq = self.ack_expected;
                    self.transmit_frame(ctx, msg, FrameKind::Data, seq);
                }
            }

            NodeEvent::Timer { slot: TimerSlot::T2, timer_id } => {
                let seq = ctx
                    .timer_data(timer_id)
                    .ok()
                    .flatten()
                    .and_then(|data| data.first().copied())
                    .unwrap_or(self.pending_ack_seq as u8) as u16;
                ctx.print(&format!("ACK timeout, sending explicit ACK for seq={seq}"));
                self.ack_pending = false;
                self.transmit_frame(ctx, Vec::new(), FrameKind::Ack, seq);
            }

            NodeEvent::Timer { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_core::LinkInfo;
    use netsim_engine::{NodeState, Simulator};

    fn two_node_sim(duration_usec: u64, loss_exponent: Option<u8>) -> Simulator {
        let mut lb_a = netsim_core::Link::new_loopback();
        lb_a.attach(0);
        let mut lb_b = netsim_core::Link::new_loopback();
        lb_b.attach(1);
        let mut wan = netsim_core::Link::new_wan();
        wan.attach(0);
        wan.attach(1);

        let mut info_a = LinkInfo::wan(1_000_000, 10_000);
        info_a.loss_exponent = loss_exponent;
        let mut info_b = LinkInfo::wan(1_000_000, 10_000);
        info_b.loss_exponent = loss_exponent;

        let node_a = NodeState::new(
            0,
            "A".into(),
            vec![0, 2],
            vec![LinkInfo::loopback(), info_a],
            100_000,
            Box::new(StopAndWaitNode::default()),
        );
        let node_b = NodeState::new(
            1,
            "B".into(),
            vec![1, 2],
            vec![LinkInfo::loopback(), info_b],
            100_000,
            Box::new(StopAndWaitNode::default()),
        );

        Simulator::new(
            vec![node_a, node_b],
            vec![lb_a, lb_b, wan],
            Some(42),
            Some(duration_usec),
            10_000_000,
            None,
            Box::new(std::io::sink()),
            true,
        )
    }

    #[test]
    fn reliable_link_delivers_most_generated_messages() {
        let mut sim = two_node_sim(5_000_000, None);
        sim.boot().unwrap();
        sim.run_to_completion().unwrap();

        let counters = sim.counters();
        assert!(counters.messages_generated > 0);
        // At most one message per direction can still be in flight when the
        // run ends (stop-and-wait allows a single outstanding frame).
        assert!(counters.messages_delivered + 2 >= counters.messages_generated);
    }

    #[test]
    fn always_loss_link_delivers_nothing() {
        let mut sim = two_node_sim(200_000, Some(0));
        sim.boot().unwrap();
        sim.run_to_completion().unwrap();

        assert_eq!(sim.counters().messages_delivered, 0);
    }

    #[test]
    fn frame_encode_decode_round_trips() {
        let frame = Frame { kind: FrameKind::Data, checksum: 0, seq: 1, ack: 0, msg: vec![1, 2, 3] };
        let encoded = frame.encode();
        let decoded = Frame::decode(&encoded).unwrap();
        assert_eq!(decoded.kind, FrameKind::Data);
        assert_eq!(decoded.seq, 1);
        assert_eq!(decoded.msg, vec![1, 2, 3]);
    }
}
