//! Conversion module for transforming evalexpr AST nodes into expression trees.
//!
//! Formula strings are parsed with evalexpr's operator tree builder and then mapped onto
//! [`Expr`] nodes. Variables are resolved to input indices through a name map, integer and
//! floating point literals are kept apart, and `x^n` with an integer literal `n` is expanded
//! into repeated multiplication since the expression language has no power node.
//!
//! The main entry points are [`Expr::parse`], which takes an explicit variable map, and
//! [`parse_with_symbols`], which assigns indices to variable names alphabetically.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use evalexpr::{build_operator_tree, Node, Operator};
use itertools::Itertools;

use crate::{
    errors::{ConvertError, ExprError},
    expr::{Expr, Func, VarRef},
};

/// Largest exponent magnitude expanded by `x^n`.
const MAX_EXPONENT: i64 = 64;

impl Expr {
    /// Parses a formula with variables resolved through `var_map`.
    ///
    /// # Example
    /// ```rust
    /// use exprfit::prelude::*;
    /// use std::collections::HashMap;
    ///
    /// let mut vars = HashMap::new();
    /// vars.insert("y".to_string(), 0);
    /// vars.insert("x".to_string(), 1);
    ///
    /// let e = Expr::parse("2*x + y^2", &vars).unwrap();
    /// assert_eq!(e.eval(&[2.0, 1.0]).unwrap(), 6.0);
    /// ```
    pub fn parse(formula: &str, var_map: &HashMap<String, u32>) -> Result<Expr, ExprError> {
        let node: Node = build_operator_tree(formula)?;
        Ok(build_ast(&node, var_map)?)
    }
}

/// Parses a formula and assigns variable indices in alphabetical order of their names.
///
/// Returns the expression together with the variable names sorted by index.
///
/// # Example
/// ```rust
/// use exprfit::prelude::*;
///
/// let (e, names) = parse_with_symbols("b * sin(a)").unwrap();
/// assert_eq!(names, vec!["a", "b"]);
/// assert_eq!(e.to_string(), "b * sin(a)");
/// ```
pub fn parse_with_symbols(formula: &str) -> Result<(Expr, Vec<String>), ExprError> {
    let node: Node = build_operator_tree(formula)?;
    let var_map = extract_symbols(&node);
    let names = var_map
        .iter()
        .sorted_by_key(|(_, &index)| index)
        .map(|(name, _)| name.clone())
        .collect();
    Ok((build_ast(&node, &var_map)?, names))
}

/// Collects the variable names of a parsed formula and numbers them alphabetically.
pub fn extract_symbols(node: &Node) -> HashMap<String, u32> {
    let mut symbols = HashSet::new();
    extract_symbols_from_node(node, &mut symbols);

    symbols
        .into_iter()
        .sorted()
        .enumerate()
        .map(|(i, v)| (v, i as u32))
        .collect()
}

fn extract_symbols_from_node(node: &Node, symbols: &mut HashSet<String>) {
    match node.operator() {
        Operator::VariableIdentifierRead { identifier } => {
            symbols.insert(identifier.to_string());
        }
        _ => {
            for child in node.children() {
                extract_symbols_from_node(child, symbols);
            }
        }
    }
}

/// Converts an evalexpr AST node into an expression tree.
///
/// # Arguments
/// * `node` - The evalexpr AST node to convert
/// * `var_map` - A mapping of variable names to their indices in the input array
///
/// # Supported syntax
/// * Arithmetic: `+`, `-`, `*`, `/` and unary `-`
/// * Integer and floating point literals
/// * Functions: `sqrt`, `sin`, `cos`, `tan`
/// * Exponentiation `x^n` where `n` is an integer literal
pub fn build_ast(node: &Node, var_map: &HashMap<String, u32>) -> Result<Expr, ConvertError> {
    match node.operator() {
        // Chains of + and * may carry more than two children
        Operator::Add => fold_children(node, var_map, Expr::Add),
        Operator::Mul => fold_children(node, var_map, Expr::Mul),
        Operator::Sub => {
            let [left, right] = binary_children(node)?;
            Ok(Expr::Sub(
                Arc::new(build_ast(left, var_map)?),
                Arc::new(build_ast(right, var_map)?),
            ))
        }
        Operator::Div => {
            let [left, right] = binary_children(node)?;
            Ok(Expr::Div(
                Arc::new(build_ast(left, var_map)?),
                Arc::new(build_ast(right, var_map)?),
            ))
        }
        Operator::Neg => {
            let inner = single_child(node)?;
            Ok(Expr::Neg(Arc::new(build_ast(inner, var_map)?)))
        }
        Operator::Const { value } => match value {
            evalexpr::Value::Float(f) => Ok(Expr::Const(*f)),
            evalexpr::Value::Int(i) => Ok(Expr::Int(*i)),
            _ => Err(ConvertError::ConstOperator(format!("{value:?}"))),
        },
        Operator::VariableIdentifierRead { identifier } => {
            let index = var_map
                .get(identifier.as_str())
                .ok_or_else(|| ConvertError::VariableNotFound(identifier.to_string()))?;
            Ok(Expr::Var(VarRef::new(*index, identifier.as_str())))
        }
        Operator::FunctionIdentifier { identifier } => {
            let func = Func::from_name(identifier)
                .ok_or_else(|| ConvertError::UnsupportedFunction(identifier.to_string()))?;
            let arg = single_child(node)?;
            Ok(Expr::Call(func, Arc::new(build_ast(arg, var_map)?)))
        }
        Operator::RootNode => build_ast(single_child(node)?, var_map),
        Operator::Exp => {
            let [base, exponent] = binary_children(node)?;
            let exponent = integer_exponent(exponent)?;
            Ok(integer_power(build_ast(base, var_map)?, exponent))
        }
        other => Err(ConvertError::UnsupportedOperator(format!("{other:?}"))),
    }
}

fn fold_children(
    node: &Node,
    var_map: &HashMap<String, u32>,
    combine: fn(Arc<Expr>, Arc<Expr>) -> Expr,
) -> Result<Expr, ConvertError> {
    let children = node.children();
    let (first, rest) = children
        .split_first()
        .ok_or_else(|| ConvertError::Arity(format!("{:?}", node.operator())))?;
    rest.iter().try_fold(build_ast(first, var_map)?, |acc, child| {
        Ok(combine(Arc::new(acc), Arc::new(build_ast(child, var_map)?)))
    })
}

fn single_child(node: &Node) -> Result<&Node, ConvertError> {
    match node.children() {
        [child] => Ok(child),
        children => Err(ConvertError::Arity(format!(
            "{:?} with {} operands",
            node.operator(),
            children.len()
        ))),
    }
}

fn binary_children(node: &Node) -> Result<[&Node; 2], ConvertError> {
    match node.children() {
        [left, right] => Ok([left, right]),
        children => Err(ConvertError::Arity(format!(
            "{:?} with {} operands",
            node.operator(),
            children.len()
        ))),
    }
}

/// Reads the exponent of `x^n`, which must be a (possibly negated) integer literal.
fn integer_exponent(node: &Node) -> Result<i64, ConvertError> {
    let exponent = match node.operator() {
        Operator::Const {
            value: evalexpr::Value::Int(n),
        } => *n,
        Operator::Neg => -integer_exponent(single_child(node)?)?,
        Operator::RootNode => integer_exponent(single_child(node)?)?,
        other => return Err(ConvertError::ExpOperator(format!("{other:?}"))),
    };
    if exponent.unsigned_abs() > MAX_EXPONENT.unsigned_abs() {
        return Err(ConvertError::ExpOperator(format!(
            "exponent {exponent} exceeds {MAX_EXPONENT}"
        )));
    }
    Ok(exponent)
}

/// Expands `base^exponent` into products, with `base^0 = 1` and `base^-n = 1 / base^n`.
fn integer_power(base: Expr, exponent: i64) -> Expr {
    match exponent {
        0 => Expr::Int(1),
        n if n < 0 => Expr::Div(Arc::new(Expr::Int(1)), Arc::new(integer_power(base, -n))),
        n => {
            let factor = Arc::new(base.clone());
            (1..n).fold(base, |acc, _| Expr::Mul(Arc::new(acc), Arc::clone(&factor)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{sin, sqrt};
    use approx::assert_relative_eq;

    fn vars(names: &[&str]) -> HashMap<String, u32> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i as u32))
            .collect()
    }

    #[test]
    fn test_literals_keep_their_kind() -> Result<(), Box<dyn std::error::Error>> {
        let map = vars(&["x"]);
        assert_eq!(Expr::parse("x * 1", &map)?.simplify(), Expr::var(0, "x"));
        let float = Expr::parse("x * 1.0", &map)?;
        assert_eq!(float.simplify(), float);
        Ok(())
    }

    #[test]
    fn test_functions_and_precedence() -> Result<(), Box<dyn std::error::Error>> {
        let map = vars(&["x", "y"]);
        let e = Expr::parse("sqrt(x) + sin(x * y) / 2", &map)?;
        let x = Expr::var(0, "x");
        let y = Expr::var(1, "y");
        assert_eq!(e, sqrt(&x) + sin(&x * &y) / 2);
        Ok(())
    }

    #[test]
    fn test_integer_power_expansion() -> Result<(), Box<dyn std::error::Error>> {
        let map = vars(&["x"]);
        let x = Expr::var(0, "x");
        assert_eq!(Expr::parse("x^3", &map)?, &x * &x * &x);
        assert_eq!(Expr::parse("x^1", &map)?, x);
        assert_eq!(Expr::parse("x^0", &map)?, Expr::Int(1));
        assert_relative_eq!(Expr::parse("x^(-2)", &map)?.eval(&[2.0])?, 0.25);
        Ok(())
    }

    #[test]
    fn test_parse_with_symbols_orders_alphabetically() -> Result<(), Box<dyn std::error::Error>> {
        let (e, names) = parse_with_symbols("z * x + y")?;
        assert_eq!(names, vec!["x", "y", "z"]);
        assert_eq!(e.eval(&[1.0, 2.0, 3.0])?, 5.0);
        Ok(())
    }

    #[test]
    fn test_errors() {
        let map = vars(&["x"]);
        assert!(matches!(
            Expr::parse("x + w", &map),
            Err(ExprError::Convert(ConvertError::VariableNotFound(_)))
        ));
        assert!(matches!(
            Expr::parse("exp(x)", &map),
            Err(ExprError::Convert(ConvertError::UnsupportedFunction(_)))
        ));
        assert!(matches!(
            Expr::parse("x^x", &map),
            Err(ExprError::Convert(ConvertError::ExpOperator(_)))
        ));
        assert!(matches!(
            Expr::parse("x^1000", &map),
            Err(ExprError::Convert(ConvertError::ExpOperator(_)))
        ));
        assert!(matches!(Expr::parse("x + )", &map), Err(ExprError::Parse(_))));
    }
}
