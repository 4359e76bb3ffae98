//! Vocabulary shared by the AST and the IR.
use std::fmt::{self, Display};
use std::str::FromStr;

/// Iteration policy of a computation block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Policy {
    /// Vertical planes are independent and may run in any order.
    Parallel,
    /// Planes are visited from the bottom of the domain upwards.
    Forward,
    /// Planes are visited from the top of the domain downwards.
    Backward,
}

impl Policy {
    /// True for the policies that impose an order on the vertical planes.
    pub fn is_sequential(&self) -> bool {
        !matches!(self, Policy::Parallel)
    }

    /// True if a vertical offset `dk` refers to a plane this policy visits
    /// before the current one.
    pub fn visits_before(&self, dk: i64) -> bool {
        match self {
            Policy::Parallel => false,
            Policy::Forward => dk < 0,
            Policy::Backward => dk > 0,
        }
    }
}

impl FromStr for Policy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PARALLEL" => Ok(Policy::Parallel),
            "FORWARD" => Ok(Policy::Forward),
            "BACKWARD" => Ok(Policy::Backward),
            _ => Err(format!(
                "Unknown iteration policy `{s}', expected one of PARALLEL, FORWARD or BACKWARD"
            )),
        }
    }
}

impl Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Policy::Parallel => "PARALLEL",
            Policy::Forward => "FORWARD",
            Policy::Backward => "BACKWARD",
        };
        f.write_str(name)
    }
}

/// Element type of a field or scalar parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum DataType {
    F64,
    F32,
    I64,
    I32,
    Bool,
}

impl DataType {
    /// Convert an `f64` computed value into the value stored in an element
    /// of this type.
    pub fn cast(&self, value: f64) -> f64 {
        match self {
            DataType::F64 => value,
            DataType::F32 => value as f32 as f64,
            DataType::I64 => value as i64 as f64,
            DataType::I32 => value as i32 as f64,
            DataType::Bool => {
                if value != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F64 | DataType::F32)
    }
}

impl FromStr for DataType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f64" | "float64" => Ok(DataType::F64),
            "f32" | "float32" => Ok(DataType::F32),
            "i64" | "int64" => Ok(DataType::I64),
            "i32" | "int32" => Ok(DataType::I32),
            "bool" => Ok(DataType::Bool),
            _ => Err(format!("Unknown data type `{s}'")),
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::F64 => "f64",
            DataType::F32 => "f32",
            DataType::I64 => "i64",
            DataType::I32 => "i32",
            DataType::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Dimensionality of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Dims {
    /// A single value broadcast to every grid point.
    Zero,
    /// A full three dimensional field.
    #[default]
    IJK,
}

impl Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dims::Zero => write!(f, "()"),
            Dims::IJK => write!(f, "IJK"),
        }
    }
}

/// A constant appearing in the source or bound to an external.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Literal {
    pub fn as_f64(&self) -> f64 {
        match self {
            Literal::Int(v) => *v as f64,
            Literal::Float(v) => *v,
            Literal::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl FromStr for Literal {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "True" | "true" => return Ok(Literal::Bool(true)),
            "False" | "false" => return Ok(Literal::Bool(false)),
            _ => (),
        }
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Literal::Int(v));
        }
        s.parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| format!("`{s}' is not a number or boolean"))
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            // `{:?}` keeps a decimal point so the text reads back as a float.
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
        }
    }
}

/// Unary operators and single argument built-in functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Abs,
    Sqrt,
    Exp,
    Log,
    Floor,
    Ceil,
    Sin,
    Cos,
    Tan,
}

impl UnaryOp {
    /// Look up a built-in function of one argument.
    pub fn builtin(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => UnaryOp::Abs,
            "sqrt" => UnaryOp::Sqrt,
            "exp" => UnaryOp::Exp,
            "log" => UnaryOp::Log,
            "floor" => UnaryOp::Floor,
            "ceil" => UnaryOp::Ceil,
            "sin" => UnaryOp::Sin,
            "cos" => UnaryOp::Cos,
            "tan" => UnaryOp::Tan,
            _ => return None,
        })
    }

    /// The name of the function if this operator is a built-in.
    pub fn function_name(&self) -> Option<&'static str> {
        Some(match self {
            UnaryOp::Abs => "abs",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Floor => "floor",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Neg | UnaryOp::Pos | UnaryOp::Not => return None,
        })
    }

    pub fn apply(&self, v: f64) -> f64 {
        match self {
            UnaryOp::Neg => -v,
            UnaryOp::Pos => v,
            UnaryOp::Not => bool_to_f64(v == 0.0),
            UnaryOp::Abs => v.abs(),
            UnaryOp::Sqrt => v.sqrt(),
            UnaryOp::Exp => v.exp(),
            UnaryOp::Log => v.ln(),
            UnaryOp::Floor => v.floor(),
            UnaryOp::Ceil => v.ceil(),
            UnaryOp::Sin => v.sin(),
            UnaryOp::Cos => v.cos(),
            UnaryOp::Tan => v.tan(),
        }
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => f.write_str("-"),
            UnaryOp::Pos => f.write_str("+"),
            UnaryOp::Not => f.write_str("not "),
            op => f.write_str(op.function_name().unwrap_or_default()),
        }
    }
}

/// Binary operators and two argument built-in functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Min,
    Max,
}

impl BinaryOp {
    /// Look up a built-in function of two arguments.
    pub fn builtin(name: &str) -> Option<Self> {
        Some(match name {
            "min" => BinaryOp::Min,
            "max" => BinaryOp::Max,
            "pow" => BinaryOp::Pow,
            _ => return None,
        })
    }

    /// Functions are printed in call syntax.
    pub fn function_name(&self) -> Option<&'static str> {
        match self {
            BinaryOp::Min => Some("min"),
            BinaryOp::Max => Some("max"),
            _ => None,
        }
    }

    /// Binding strength used when printing. Higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
            BinaryOp::Pow => 8,
            BinaryOp::Min | BinaryOp::Max => 9,
        }
    }

    pub fn apply(&self, l: f64, r: f64) -> f64 {
        match self {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => l / r,
            // Floored modulo, the sign follows the divisor.
            BinaryOp::Mod => l - r * (l / r).floor(),
            BinaryOp::Pow => l.powf(r),
            BinaryOp::Eq => bool_to_f64(l == r),
            BinaryOp::Ne => bool_to_f64(l != r),
            BinaryOp::Lt => bool_to_f64(l < r),
            BinaryOp::Le => bool_to_f64(l <= r),
            BinaryOp::Gt => bool_to_f64(l > r),
            BinaryOp::Ge => bool_to_f64(l >= r),
            BinaryOp::And => bool_to_f64(l != 0.0 && r != 0.0),
            BinaryOp::Or => bool_to_f64(l != 0.0 || r != 0.0),
            BinaryOp::Min => l.min(r),
            BinaryOp::Max => l.max(r),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
        };
        f.write_str(s)
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casts_follow_element_type() {
        assert_eq!(DataType::I32.cast(2.7), 2.0);
        assert_eq!(DataType::I64.cast(-2.7), -2.0);
        assert_eq!(DataType::Bool.cast(0.25), 1.0);
        assert_eq!(DataType::F32.cast(0.1), 0.1f32 as f64);
    }

    #[test]
    fn literals_read_back() {
        assert_eq!("0.5".parse::<Literal>(), Ok(Literal::Float(0.5)));
        assert_eq!("3".parse::<Literal>(), Ok(Literal::Int(3)));
        assert_eq!("True".parse::<Literal>(), Ok(Literal::Bool(true)));
        assert!("abc".parse::<Literal>().is_err());
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
    }

    #[test]
    fn modulo_is_floored() {
        assert_eq!(BinaryOp::Mod.apply(-1.0, 3.0), 2.0);
        assert_eq!(BinaryOp::Mod.apply(7.0, 3.0), 1.0);
    }
}
