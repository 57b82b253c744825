use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NODE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The kind of a node in a factor graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum NodeKind {
    /// Variable over a finite index range.
    Discrete,
    /// A probability vector living in a parameter store.
    Proportions,
}

/// A lightweight reference to an individual node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Node {
    id: u64,
    kind: NodeKind,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        let id = NODE_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self { id, kind }
    }

    /// Returns the global identifier for the node.
    pub fn id(self) -> u64 {
        self.id
    }

    /// Returns the kind of the node.
    pub fn kind(self) -> NodeKind {
        self.kind
    }
}

impl From<Node> for NodeKind {
    fn from(node: Node) -> Self {
        node.kind()
    }
}

/// A discrete variable: an identity plus the size of its domain.
///
/// The current value is not stored here; it lives in the model state so
/// that factors referencing the variable never observe value changes
/// through their identity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DiscreteVariable {
    node: Node,
    domain_size: usize,
}

impl DiscreteVariable {
    /// Creates a new discrete variable over `0..domain_size`.
    pub fn new(domain_size: usize) -> Self {
        if domain_size == 0 {
            panic!("Discrete domain cannot be empty");
        }
        Self {
            node: Node::new(NodeKind::Discrete),
            domain_size,
        }
    }

    /// Returns the underlying node.
    pub fn node(self) -> Node {
        self.node
    }

    /// Returns the number of values the variable can take.
    pub fn domain_size(self) -> usize {
        self.domain_size
    }
}

impl From<DiscreteVariable> for Node {
    fn from(var: DiscreteVariable) -> Self {
        var.node
    }
}

/// A reference to a probability vector held in a parameter store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ProportionsVariable(Node);

impl ProportionsVariable {
    /// Creates a new proportions node.
    pub fn new() -> Self {
        ProportionsVariable(Node::new(NodeKind::Proportions))
    }

    /// Returns the underlying node.
    pub fn node(self) -> Node {
        self.0
    }
}

impl Default for ProportionsVariable {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ProportionsVariable> for Node {
    fn from(var: ProportionsVariable) -> Self {
        var.0
    }
}

/// What a factor holds at one of its positions.
///
/// Single variables compare by identity. Collections compare by value,
/// element by element, so two factors built over equal component lists
/// are structurally the same factor.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Neighbor {
    Variable(Node),
    Collection(Arc<[Node]>),
}

impl Neighbor {
    /// Builds a value-compared position from an ordered list of nodes.
    pub fn collection<I>(nodes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        Neighbor::Collection(nodes.into_iter().map(Into::into).collect())
    }

    /// Iterates over every node referenced by this position.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        match self {
            Neighbor::Variable(node) => std::slice::from_ref(node).iter(),
            Neighbor::Collection(nodes) => nodes.iter(),
        }
    }

    /// Returns true if `node` is referenced by this position.
    pub fn touches(&self, node: Node) -> bool {
        self.nodes().any(|n| *n == node)
    }

    /// Stable hash of the neighbour identity, independent of any value.
    pub fn identity_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl From<Node> for Neighbor {
    fn from(node: Node) -> Self {
        Neighbor::Variable(node)
    }
}

impl From<DiscreteVariable> for Neighbor {
    fn from(var: DiscreteVariable) -> Self {
        Neighbor::Variable(var.node())
    }
}

impl From<ProportionsVariable> for Neighbor {
    fn from(var: ProportionsVariable) -> Self {
        Neighbor::Variable(var.node())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_are_unique() {
        let a = DiscreteVariable::new(3);
        let b = DiscreteVariable::new(3);
        assert_ne!(a, b);
        assert_ne!(a.node().id(), b.node().id());
        assert_eq!(a.node().kind(), NodeKind::Discrete);
    }

    #[test]
    fn collections_compare_by_value() {
        let params = [ProportionsVariable::new(), ProportionsVariable::new()];
        let left = Neighbor::collection(params);
        let right = Neighbor::collection(params.to_vec());
        assert_eq!(left, right);
        assert_eq!(left.identity_hash(), right.identity_hash());

        let reversed = Neighbor::collection([params[1], params[0]]);
        assert_ne!(left, reversed);
    }

    #[test]
    fn neighbor_touches_members() {
        let params = [ProportionsVariable::new(), ProportionsVariable::new()];
        let collection = Neighbor::collection(params);
        assert!(collection.touches(params[1].node()));
        assert!(!collection.touches(DiscreteVariable::new(2).node()));
    }
}
