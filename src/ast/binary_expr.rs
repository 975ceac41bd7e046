use super::{BinaryOp, Expression};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
}

impl BinaryExpr {
    pub fn new(op: BinaryOp, lhs: Expression, rhs: Expression) -> BinaryExpr {
        BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

impl From<BinaryExpr> for Expression {
    fn from(value: BinaryExpr) -> Self {
        Expression::Binary(value)
    }
}
