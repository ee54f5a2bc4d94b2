//! Debug implementations for shareable values

use std::fmt;

use super::*;

impl fmt::Debug for Shareable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = self.affinity {
            write!(f, "@{} ", owner)?;
        }
        fmt::Debug::fmt(&self.kind, f)
    }
}

impl fmt::Debug for ShareableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareableKind::Primitive(p) => write!(f, "{}", p),

            ShareableKind::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                write!(f, "]")
            }

            ShareableKind::Object(fields) => {
                if fields.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, value)?;
                }
                write!(f, " }}")
            }

            ShareableKind::Function { func, closure } => match closure {
                Some(closure) => write!(f, "{:?} closing over {:?}", func, closure),
                None => write!(f, "{:?}", func),
            },

            // Contents are not printed: they may change concurrently
            ShareableKind::Mutable(cell) => write!(f, "{:?}", cell),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Undefined => write!(f, "undefined"),
            Primitive::Null => write!(f, "null"),
            Primitive::Bool(b) => write!(f, "{}", b),
            Primitive::Number(n) => write!(f, "{}", n),
            Primitive::String(s) => write!(f, "{:?}", s.as_ref()),
        }
    }
}
