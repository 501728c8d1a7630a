use std::collections::BTreeSet;

use crate::{env, lexer::Op, number::Number};

/// A parsed statement or expression. Every variant records the byte offset
/// where it begins in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number {
        value: Number,
        offset: usize,
    },
    Name {
        name: String,
        offset: usize,
    },
    Call {
        name: String,
        args: Vec<Node>,
        offset: usize,
    },
    Unary {
        op: Op,
        operand: Box<Node>,
        offset: usize,
    },
    Binary {
        op: Op,
        left: Box<Node>,
        right: Box<Node>,
        offset: usize,
    },
    Assign {
        name: String,
        value: Box<Node>,
        offset: usize,
    },
    /// `plot ...`; executed by a plotting front end, never evaluated here.
    Plot(PlotCommand),
    /// `simplify <expr>`; handed to a computer-algebra front end.
    Simplify {
        expr: Box<Node>,
        offset: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotCommand {
    pub expr: Box<Node>,
    /// Free variable named by a `f(t) =` label.
    pub variable: Option<String>,
    /// The label text itself, e.g. `f(t)`.
    pub label: Option<String>,
    pub domain: Option<(Box<Node>, Box<Node>)>,
    pub target: Option<PlotTarget>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotTarget {
    pub format: String,
    pub offset: usize,
}

impl Node {
    pub fn offset(&self) -> usize {
        match self {
            Node::Number { offset, .. }
            | Node::Name { offset, .. }
            | Node::Call { offset, .. }
            | Node::Unary { offset, .. }
            | Node::Binary { offset, .. }
            | Node::Assign { offset, .. }
            | Node::Simplify { offset, .. } => *offset,
            Node::Plot(command) => command.offset,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Node::Plot(_) | Node::Simplify { .. })
    }

    /// Names referenced by this tree that are neither built-in constants nor
    /// built-in functions, in their original spelling. These are the
    /// candidates for a plot's free variable.
    pub fn free_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_names(&mut names);
        names.retain(|name| !env::is_builtin_name(name));
        names
    }

    fn collect_names(&self, names: &mut BTreeSet<String>) {
        match self {
            Node::Number { .. } => {}
            Node::Name { name, .. } => {
                names.insert(name.clone());
            }
            Node::Call { args, .. } => args.iter().for_each(|arg| arg.collect_names(names)),
            Node::Unary { operand, .. } => operand.collect_names(names),
            Node::Binary { left, right, .. } => {
                left.collect_names(names);
                right.collect_names(names);
            }
            Node::Assign { value, .. } => value.collect_names(names),
            Node::Simplify { expr, .. } => expr.collect_names(names),
            Node::Plot(command) => command.expr.collect_names(names),
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Number { value, .. } => write!(f, "{value}"),
            Node::Name { name, .. } => write!(f, "{name}"),
            Node::Call { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Node::Unary { op, operand, .. } => write!(f, "({op}{operand})"),
            Node::Binary {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
            Node::Assign { name, value, .. } => write!(f, "{name} = {value}"),
            Node::Simplify { expr, .. } => write!(f, "simplify {expr}"),
            Node::Plot(command) => {
                write!(f, "plot ")?;
                if let Some(label) = &command.label {
                    write!(f, "{label} = ")?;
                }
                write!(f, "{}", command.expr)?;
                if let Some((start, end)) = &command.domain {
                    write!(f, " from {start} to {end}")?;
                }
                if let Some(target) = &command.target {
                    write!(f, " target {}", target.format)?;
                }
                Ok(())
            }
        }
    }
}
