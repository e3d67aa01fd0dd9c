//! Arena-allocated syntax tree for custom expressions.
//!
//! Nodes live in one `Vec` owned by [`Expr`] and refer to their children by
//! [`NodeId`]. Every node records its height so the parser can refuse trees
//! deeper than the evaluator is allowed to recurse.

use std::fmt;

/// Index of a node inside its [`Expr`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Free functions callable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Global {
    Number,
    String,
    Boolean,
    ParseInt,
    ParseFloat,
    IsNaN,
}

impl Global {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Number" => Global::Number,
            "String" => Global::String,
            "Boolean" => Global::Boolean,
            "parseInt" => Global::ParseInt,
            "parseFloat" => Global::ParseFloat,
            "isNaN" => Global::IsNaN,
            _ => return None,
        })
    }
}

/// `Math.*` functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Round,
    Floor,
    Ceil,
    Abs,
    Min,
    Max,
    Pow,
    Sqrt,
}

impl MathFn {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "round" => MathFn::Round,
            "floor" => MathFn::Floor,
            "ceil" => MathFn::Ceil,
            "abs" => MathFn::Abs,
            "min" => MathFn::Min,
            "max" => MathFn::Max,
            "pow" => MathFn::Pow,
            "sqrt" => MathFn::Sqrt,
            _ => return None,
        })
    }
}

/// Methods callable on a string, number or array receiver.
pub const METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "includes",
    "startsWith",
    "endsWith",
    "slice",
    "substring",
    "split",
    "join",
    "replace",
    "toFixed",
    "toString",
    "indexOf",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    /// The bound input value.
    Input,
    Array(Vec<NodeId>),
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Logical {
        op: LogicalOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Conditional {
        test: NodeId,
        then: NodeId,
        otherwise: NodeId,
    },
    /// `object.property` read (not a call).
    Member {
        object: NodeId,
        property: String,
    },
    Index {
        object: NodeId,
        index: NodeId,
    },
    MethodCall {
        receiver: NodeId,
        method: String,
        args: Vec<NodeId>,
    },
    MathCall {
        function: MathFn,
        args: Vec<NodeId>,
    },
    GlobalCall {
        function: Global,
        args: Vec<NodeId>,
    },
}

impl Node {
    fn children(&self) -> Vec<NodeId> {
        match self {
            Node::Number(_)
            | Node::Str(_)
            | Node::Bool(_)
            | Node::Null
            | Node::Undefined
            | Node::Input => Vec::new(),
            Node::Array(items) => items.clone(),
            Node::Unary { operand, .. } => vec![*operand],
            Node::Binary { lhs, rhs, .. } | Node::Logical { lhs, rhs, .. } => vec![*lhs, *rhs],
            Node::Conditional {
                test,
                then,
                otherwise,
            } => vec![*test, *then, *otherwise],
            Node::Member { object, .. } => vec![*object],
            Node::Index { object, index } => vec![*object, *index],
            Node::MethodCall { receiver, args, .. } => {
                let mut ids = vec![*receiver];
                ids.extend(args);
                ids
            }
            Node::MathCall { args, .. } | Node::GlobalCall { args, .. } => args.clone(),
        }
    }
}

/// A parsed expression: the node arena plus its root.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    nodes: Vec<Node>,
    heights: Vec<usize>,
    root: Option<NodeId>,
}

impl Expr {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            heights: Vec::new(),
            root: None,
        }
    }

    /// Append a node and return its id together with its height.
    pub(crate) fn push(&mut self, node: Node) -> (NodeId, usize) {
        let height = 1 + node
            .children()
            .into_iter()
            .map(|c| self.height(c))
            .max()
            .unwrap_or(0);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.heights.push(height);
        (id, height)
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn height(&self, id: NodeId) -> usize {
        self.heights[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_follow_children() {
        let mut expr = Expr::new();
        let (a, ha) = expr.push(Node::Input);
        let (b, hb) = expr.push(Node::Number(1.0));
        let (sum, hs) = expr.push(Node::Binary {
            op: BinaryOp::Add,
            lhs: a,
            rhs: b,
        });
        let (neg, hn) = expr.push(Node::Unary {
            op: UnaryOp::Neg,
            operand: sum,
        });
        expr.set_root(neg);
        assert_eq!((ha, hb, hs, hn), (1, 1, 2, 3));
        assert_eq!(expr.len(), 4);
        assert_eq!(expr.root(), Some(neg));
    }

    #[test]
    fn whitelists() {
        assert_eq!(MathFn::from_name("sqrt"), Some(MathFn::Sqrt));
        assert_eq!(MathFn::from_name("random"), None);
        assert_eq!(Global::from_name("parseInt"), Some(Global::ParseInt));
        assert_eq!(Global::from_name("eval"), None);
        assert!(METHODS.contains(&"toFixed"));
    }
}
