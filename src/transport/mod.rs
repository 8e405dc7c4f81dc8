mod expr;

pub use expr::{ExprError, LightPathExpression, Symbol};

use crate::geometry::Vec3;
use crate::materials::TransportEvent;

/// Handle into a `LightTree`'s node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(u32);

/// One upstream contribution. The weight applied to the upstream node's
/// radiance is the importance-sampling estimator `brdf * cos / pdf`.
#[derive(Clone, Copy, Debug)]
struct Edge {
    upstream: NodeId,
    pdf: f32,
    brdf: Vec3,
    cos: f32,
}

impl Edge {
    fn weight(&self) -> Vec3 {
        debug_assert!(self.pdf > 0.0, "edge stored with non-positive pdf");
        self.brdf * (self.cos / self.pdf)
    }
}

#[derive(Debug)]
struct TransportNode {
    event: TransportEvent,
    emitted: Vec3,
    upstream: Vec<Edge>,
}

/// Record of how radiance arrived along one camera ray: a tree of transport
/// events rooted at the Eye node, each edge weighted by the sampling
/// estimator that produced it. Stored as an index arena, rebuilt (cleared)
/// for every camera ray, and queried for total radiance or for the subset
/// of paths selected by a light-path expression.
#[derive(Debug, Default)]
pub struct LightTree {
    nodes: Vec<TransportNode>,
}

impl LightTree {
    pub fn new() -> LightTree {
        LightTree::default()
    }

    /// Drops all nodes but keeps the allocation for the next camera ray.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn event(&self, node: NodeId) -> TransportEvent {
        self.nodes[node.0 as usize].event
    }

    pub fn add_node(&mut self, event: TransportEvent, emitted: Vec3) -> NodeId {
        debug_assert!(emitted.is_finite(), "non-finite emission entering tree");
        self.nodes.push(TransportNode {
            event,
            emitted,
            upstream: Vec::new(),
        });
        NodeId((self.nodes.len() - 1) as u32)
    }

    /// Attaches `upstream` below `node` with the estimator annotation.
    /// Callers must have rejected `pdf <= 0` samples already.
    pub fn add_upstream(&mut self, node: NodeId, upstream: NodeId, pdf: f32, brdf: Vec3, cos: f32) {
        debug_assert!(pdf > 0.0 && pdf.is_finite());
        debug_assert!(brdf.is_finite() && cos.is_finite());
        self.nodes[node.0 as usize].upstream.push(Edge {
            upstream,
            pdf,
            brdf,
            cos,
        });
    }

    /// Unit-weight edge, used to hang lobe roots under the Eye node.
    pub fn add_upstream_unit(&mut self, node: NodeId, upstream: NodeId) {
        self.add_upstream(node, upstream, 1.0, Vec3::splat(1.0), 1.0);
    }

    /// Total outgoing radiance at `root`: own emission plus every upstream
    /// contribution weighted by its edge estimator.
    pub fn radiance(&self, root: NodeId) -> Vec3 {
        let node = &self.nodes[root.0 as usize];
        let mut out = node.emitted;
        for edge in &node.upstream {
            out += edge.weight() * self.radiance(edge.upstream);
        }
        out
    }

    /// Radiance restricted to the transport paths selected by `channel`:
    /// the sum, over every root-to-node path whose event sequence matches
    /// the whole expression, of the path's accumulated edge weight times
    /// the terminal node's emission. Each matching path contributes once
    /// regardless of how many `*` alignments admit it.
    pub fn radiance_channel(&self, root: NodeId, channel: &LightPathExpression) -> Vec3 {
        let mut events = Vec::with_capacity(8);
        let mut out = Vec3::zero();
        self.channel_walk(root, channel, Vec3::splat(1.0), &mut events, &mut out);
        out
    }

    fn channel_walk(
        &self,
        id: NodeId,
        channel: &LightPathExpression,
        weight: Vec3,
        events: &mut Vec<TransportEvent>,
        out: &mut Vec3,
    ) {
        let node = &self.nodes[id.0 as usize];
        events.push(node.event);

        if node.emitted != Vec3::zero() && channel.matches(events) {
            *out += weight * node.emitted;
        }

        for edge in &node.upstream {
            self.channel_walk(edge.upstream, channel, weight * edge.weight(), events, out);
        }

        events.pop();
    }
}
