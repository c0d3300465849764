//! Expression IR for the tessera tensor compiler.
//!
//! This representation assumes:
//! - Loop nests have already been synthesized from the iteration domains
//! - Types are concrete and stored with every expression
//! - A value's SIMD width is carried by its type (`lanes`; 1 means scalar)
//!
//! Expressions form an owned, acyclic tree. Passes rewrite subtrees in place
//! by replacing a node with a freshly built node of equal or widened type.

/// Scalar element kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Statement type. Carried by `Store`, `Block`, `For`, and `IfThenElse`.
    Void,
    Bool,
    /// Signed integer of the given bit width.
    Int(u8),
    /// Unsigned integer of the given bit width.
    UInt(u8),
    /// IEEE float of the given bit width.
    Float(u8),
}

/// A value type: scalar kind plus SIMD lane count.
///
/// `lanes == 1` denotes a scalar; `lanes == N` a vector of N elements of
/// `kind`. Two types are compatible iff their scalar kinds match;
/// vectorization only ever changes `lanes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    pub kind: ScalarKind,
    pub lanes: u32,
}

impl Type {
    pub const fn scalar(kind: ScalarKind) -> Type {
        Type { kind, lanes: 1 }
    }

    pub const fn vector(kind: ScalarKind, lanes: u32) -> Type {
        Type { kind, lanes }
    }

    pub const fn void() -> Type {
        Type::scalar(ScalarKind::Void)
    }

    /// The default index/iterator type.
    pub const fn i32() -> Type {
        Type::scalar(ScalarKind::Int(32))
    }

    pub const fn f32() -> Type {
        Type::scalar(ScalarKind::Float(32))
    }

    pub const fn bool() -> Type {
        Type::scalar(ScalarKind::Bool)
    }

    /// Same scalar kind, different lane count.
    pub fn with_lanes(self, lanes: u32) -> Type {
        Type { lanes, ..self }
    }

    pub fn is_scalar(&self) -> bool {
        self.lanes == 1
    }

    pub fn is_vector(&self) -> bool {
        self.lanes > 1
    }

    /// Types are compatible when their scalar kinds match.
    pub fn compatible_with(&self, other: &Type) -> bool {
        self.kind == other.kind
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Comparisons produce `Bool` results (of the operand lane width).
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    /// Operator symbol for diagnostics.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Min => "min",
            BinOp::Max => "max",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Execution kind of a for-loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForKind {
    Serial,
    Parallel,
    Vectorized,
    Unrolled,
}

/// Vectorization annotation carried by a `Vectorized` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorizeInfo {
    /// The SIMD lane width the loop should be widened to.
    pub factor: u32,
}

impl VectorizeInfo {
    pub fn new(factor: u32) -> Self {
        VectorizeInfo { factor }
    }

    pub fn valid(&self) -> bool {
        self.factor > 1
    }
}

/// A counted for-loop over `[min, min + extent)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    /// Loop variable name. Loop variables are `Int(32)` scalars.
    pub var: String,
    pub min: Box<Expr>,
    pub extent: Box<Expr>,
    pub kind: ForKind,
    /// Present on loops scheduled for vectorization.
    pub vectorize: Option<VectorizeInfo>,
    pub body: Box<Expr>,
}

impl ForLoop {
    pub fn is_vectorized(&self) -> bool {
        self.kind == ForKind::Vectorized
    }
}

/// The main expression type: a concrete type plus the node payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub ty: Type,
    pub kind: ExprKind,
}

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal. The carried type supplies kind and lanes.
    IntImm(i64),
    /// Float literal.
    FloatImm(f64),
    /// A variable reference by name.
    Var(String),
    /// Conversion of the operand to this node's type; lane counts agree.
    Cast(Box<Expr>),
    /// A binary operation over operands of equal lane count.
    Binary {
        op: BinOp,
        a: Box<Expr>,
        b: Box<Expr>,
    },
    /// Ternary select. The condition may be scalar or full-width.
    Select {
        cond: Box<Expr>,
        true_value: Box<Expr>,
        false_value: Box<Expr>,
    },
    /// Read from a named tensor buffer.
    Load { tensor: String, indices: Vec<Expr> },
    /// Write to a named tensor buffer.
    Store {
        tensor: String,
        value: Box<Expr>,
        indices: Vec<Expr>,
    },
    /// A length-`lanes` vector whose i-th element is `base + i * stride`.
    /// `base` and `stride` are scalar.
    Ramp {
        base: Box<Expr>,
        stride: Box<Expr>,
        lanes: u32,
    },
    /// A length-`lanes` vector whose every element equals the scalar `value`.
    Broadcast { value: Box<Expr>, lanes: u32 },
    /// `let name = value in body`.
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    /// Conditional statement; the else branch is optional.
    IfThenElse {
        cond: Box<Expr>,
        then_case: Box<Expr>,
        else_case: Option<Box<Expr>>,
    },
    For(ForLoop),
    /// A statement sequence.
    Block(Vec<Expr>),
    /// An opaque call. The vectorizer does not widen calls.
    Call { name: String, args: Vec<Expr> },
}

// Placeholder used when a rewrite takes ownership of a node's children.
impl Default for ExprKind {
    fn default() -> Self {
        ExprKind::IntImm(0)
    }
}

impl Expr {
    /// An `Int(32)` literal, the IR's default integer constant.
    pub fn int(value: i64) -> Expr {
        Expr {
            ty: Type::i32(),
            kind: ExprKind::IntImm(value),
        }
    }

    pub fn int_of(value: i64, ty: Type) -> Expr {
        Expr {
            ty,
            kind: ExprKind::IntImm(value),
        }
    }

    pub fn float(value: f64) -> Expr {
        Expr {
            ty: Type::f32(),
            kind: ExprKind::FloatImm(value),
        }
    }

    pub fn var(name: impl Into<String>, ty: Type) -> Expr {
        Expr {
            ty,
            kind: ExprKind::Var(name.into()),
        }
    }

    /// Build a binary node. Comparison results are `Bool`; other operators
    /// keep the left operand's scalar kind. Lanes are the operand maximum.
    pub fn binary(op: BinOp, a: Expr, b: Expr) -> Expr {
        debug_assert!(a.ty.compatible_with(&b.ty));
        let lanes = a.ty.lanes.max(b.ty.lanes);
        let kind = if op.is_comparison() {
            ScalarKind::Bool
        } else {
            a.ty.kind
        };
        Expr {
            ty: Type::vector(kind, lanes),
            kind: ExprKind::Binary {
                op,
                a: Box::new(a),
                b: Box::new(b),
            },
        }
    }

    pub fn cast(value: Expr, to: ScalarKind) -> Expr {
        let ty = Type::vector(to, value.ty.lanes);
        Expr {
            ty,
            kind: ExprKind::Cast(Box::new(value)),
        }
    }

    pub fn select(cond: Expr, true_value: Expr, false_value: Expr) -> Expr {
        debug_assert!(true_value.ty.compatible_with(&false_value.ty));
        let ty = true_value.ty;
        Expr {
            ty,
            kind: ExprKind::Select {
                cond: Box::new(cond),
                true_value: Box::new(true_value),
                false_value: Box::new(false_value),
            },
        }
    }

    /// Load of `elem`-typed values; the result width follows the indices.
    pub fn load(tensor: impl Into<String>, elem: ScalarKind, indices: Vec<Expr>) -> Expr {
        let lanes = indices.iter().map(|i| i.ty.lanes).max().unwrap_or(1);
        Expr {
            ty: Type::vector(elem, lanes),
            kind: ExprKind::Load {
                tensor: tensor.into(),
                indices,
            },
        }
    }

    pub fn store(tensor: impl Into<String>, value: Expr, indices: Vec<Expr>) -> Expr {
        Expr {
            ty: Type::void(),
            kind: ExprKind::Store {
                tensor: tensor.into(),
                value: Box::new(value),
                indices,
            },
        }
    }

    pub fn ramp(base: Expr, stride: Expr, lanes: u32) -> Expr {
        debug_assert!(base.ty.is_scalar() && stride.ty.is_scalar());
        let ty = base.ty.with_lanes(lanes);
        Expr {
            ty,
            kind: ExprKind::Ramp {
                base: Box::new(base),
                stride: Box::new(stride),
                lanes,
            },
        }
    }

    pub fn broadcast(value: Expr, lanes: u32) -> Expr {
        debug_assert!(value.ty.is_scalar());
        let ty = value.ty.with_lanes(lanes);
        Expr {
            ty,
            kind: ExprKind::Broadcast {
                value: Box::new(value),
                lanes,
            },
        }
    }

    pub fn let_(name: impl Into<String>, value: Expr, body: Expr) -> Expr {
        let ty = body.ty;
        Expr {
            ty,
            kind: ExprKind::Let {
                name: name.into(),
                value: Box::new(value),
                body: Box::new(body),
            },
        }
    }

    pub fn if_then_else(cond: Expr, then_case: Expr, else_case: Option<Expr>) -> Expr {
        Expr {
            ty: Type::void(),
            kind: ExprKind::IfThenElse {
                cond: Box::new(cond),
                then_case: Box::new(then_case),
                else_case: else_case.map(Box::new),
            },
        }
    }

    pub fn for_loop(
        var: impl Into<String>,
        min: Expr,
        extent: Expr,
        kind: ForKind,
        body: Expr,
    ) -> Expr {
        Expr {
            ty: Type::void(),
            kind: ExprKind::For(ForLoop {
                var: var.into(),
                min: Box::new(min),
                extent: Box::new(extent),
                kind,
                vectorize: None,
                body: Box::new(body),
            }),
        }
    }

    /// A for-loop scheduled for vectorization with the given factor.
    pub fn for_vectorized(
        var: impl Into<String>,
        min: Expr,
        extent: Expr,
        factor: u32,
        body: Expr,
    ) -> Expr {
        let mut e = Expr::for_loop(var, min, extent, ForKind::Vectorized, body);
        if let ExprKind::For(f) = &mut e.kind {
            f.vectorize = Some(VectorizeInfo::new(factor));
        }
        e
    }

    pub fn block(stmts: Vec<Expr>) -> Expr {
        Expr {
            ty: Type::void(),
            kind: ExprKind::Block(stmts),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>, ty: Type) -> Expr {
        Expr {
            ty,
            kind: ExprKind::Call {
                name: name.into(),
                args,
            },
        }
    }

    pub fn lanes(&self) -> u32 {
        self.ty.lanes
    }

    pub fn is_scalar(&self) -> bool {
        self.ty.is_scalar()
    }

    /// The literal value, if this node is an integer immediate.
    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            ExprKind::IntImm(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_ramp(&self) -> bool {
        matches!(self.kind, ExprKind::Ramp { .. })
    }
}
