use crate::parse::{BaseType, TypeNode};
use crate::{Arr, PairSide};
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

/// A resolved value type.
///
/// `None` inside `Array` or `Pair` marks an unresolved component: the element
/// of an empty array literal, or a nested `pair` whose element types were
/// erased. Unresolved components act as wildcards under `==`.
#[derive(Debug, Clone)]
pub enum Type {
    Int,
    Bool,
    Char,
    Str,
    Array {
        elem: Option<Box<Type>>,
        dims: u32,
    },
    Pair(Option<Box<Type>>, Option<Box<Type>>),
    Function {
        ret: Box<Type>,
        params: Arr<Type>,
    },
}

impl Type {
    pub const fn wildcard_pair() -> Self {
        Self::Pair(None, None)
    }

    pub const fn empty_array() -> Self {
        Self::Array { elem: None, dims: 1 }
    }

    pub fn array(elem: Type, dims: u32) -> Self {
        Self::Array {
            elem: Some(Box::new(elem)),
            dims,
        }
    }

    pub fn pair(fst: Option<Type>, snd: Option<Type>) -> Self {
        Self::Pair(fst.map(Box::new), snd.map(Box::new))
    }

    pub fn array_of(elem: Type) -> Self {
        match elem {
            Self::Array { elem, dims } => Self::Array {
                elem,
                dims: dims + 1,
            },
            other => Self::array(other, 1),
        }
    }

    /// Rewrites the string alias into its array form so that comparisons only
    /// ever see one spelling.
    pub fn canonical(&self) -> Cow<'_, Type> {
        match self {
            Self::Str => Cow::Owned(Self::array(Self::Char, 1)),
            Self::Array {
                elem: Some(elem),
                dims,
            } if matches!(**elem, Self::Str) => Cow::Owned(Self::array(Self::Char, dims + 1)),
            other => Cow::Borrowed(other),
        }
    }

    pub const fn size(&self) -> u32 {
        match self {
            Self::Bool | Self::Char => 1,
            _ => 4,
        }
    }

    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. } | Self::Str)
    }

    pub const fn is_pair(&self) -> bool {
        matches!(self, Self::Pair(..))
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self.canonical().as_ref(),
            Self::Array { elem: Some(elem), dims: 1 } if matches!(**elem, Self::Char)
        )
    }

    pub fn dims(&self) -> Option<u32> {
        match self.canonical().as_ref() {
            Self::Array { dims, .. } => Some(*dims),
            _ => None,
        }
    }

    pub fn index(&self, n: u32) -> Option<Type> {
        match self.canonical().into_owned() {
            Self::Array { elem, dims } if n <= dims => Some(match (dims - n, elem) {
                (0, Some(elem)) => *elem,
                (0, None) => Self::wildcard_pair(),
                (dims, elem) => Self::Array { elem, dims },
            }),
            _ => None,
        }
    }

    pub fn side(&self, side: PairSide) -> Option<Type> {
        match self {
            Self::Pair(fst, snd) => {
                let elem = match side {
                    PairSide::Fst => fst,
                    PairSide::Snd => snd,
                };
                Some(elem.as_deref().cloned().unwrap_or_else(Self::wildcard_pair))
            }
            _ => None,
        }
    }

    /// Pairs nest by erasure: a pair stored inside a pair forgets its
    /// element types.
    pub fn erased(self) -> Option<Type> {
        if self.is_pair() {
            None
        } else {
            Some(self)
        }
    }

    pub fn ret(&self) -> Option<&Type> {
        match self {
            Self::Function { ret, .. } => Some(ret),
            _ => None,
        }
    }

    pub fn params(&self) -> Option<&[Type]> {
        match self {
            Self::Function { params, .. } => Some(params),
            _ => None,
        }
    }
}

fn side_eq(left: &Option<Box<Type>>, right: &Option<Box<Type>>) -> bool {
    match (left, right) {
        (Some(l), Some(r)) => l == r,
        _ => true,
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        use Type::*;
        match (self.canonical().as_ref(), other.canonical().as_ref()) {
            (Int, Int) | (Bool, Bool) | (Char, Char) => true,
            (Array { elem: l, dims: n }, Array { elem: r, dims: m }) => match (l, r) {
                (Some(l), Some(r)) => n == m && l == r,
                (None, _) => n <= m,
                (_, None) => m <= n,
            },
            (Pair(lf, ls), Pair(rf, rs)) => side_eq(lf, rf) && side_eq(ls, rs),
            (
                Function { ret: lr, params: lp },
                Function { ret: rr, params: rp },
            ) => lr == rr && lp == rp,
            _ => false,
        }
    }
}

impl From<BaseType> for Type {
    fn from(base: BaseType) -> Self {
        match base {
            BaseType::Int => Self::Int,
            BaseType::Bool => Self::Bool,
            BaseType::Char => Self::Char,
            BaseType::String => Self::Str,
        }
    }
}

impl From<&TypeNode> for Type {
    fn from(node: &TypeNode) -> Self {
        match node {
            TypeNode::Base(base) => Self::from(*base),
            TypeNode::Array { elem, dims } => Self::array(Self::from(elem.as_ref()), *dims),
            TypeNode::Pair(fst, snd) => Self::Pair(
                fst.as_deref().map(|t| Box::new(Self::from(t))),
                snd.as_deref().map(|t| Box::new(Self::from(t))),
            ),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Int => f.write_str("INT"),
            Self::Bool => f.write_str("BOOL"),
            Self::Char => f.write_str("CHAR"),
            Self::Str => f.write_str("STRING"),
            Self::Array { elem, dims } => {
                match elem {
                    Some(elem) => write!(f, "{elem}")?,
                    None => f.write_str("T")?,
                }
                for _ in 0..*dims {
                    f.write_str("[]")?;
                }
                Ok(())
            }
            Self::Pair(None, None) => f.write_str("PAIR"),
            Self::Pair(fst, snd) => {
                let side = |t: &Option<Box<Type>>| {
                    t.as_ref()
                        .map_or_else(|| "PAIR".to_string(), |t| t.to_string())
                };
                write!(f, "PAIR({},{})", side(fst), side(snd))
            }
            Self::Function { ret, params } => {
                write!(f, "{ret}(")?;
                for (i, param) in params.iter().enumerate() {
                    if i != 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{param}")?;
                }
                f.write_str(")")
            }
        }
    }
}
