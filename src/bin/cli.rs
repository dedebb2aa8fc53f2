use clap::{Parser, Subcommand};
use exprfit::convert::parse_with_symbols;
use std::process;

#[derive(Parser)]
#[command(name = "exprfit")]
#[command(about = "Differentiate, simplify and evaluate mathematical expressions")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the partial derivative of an expression
    Diff {
        /// Expression to differentiate
        expression: String,
        /// Variable to differentiate with respect to
        variable: String,
        /// Order of the derivative
        #[arg(short, long, default_value_t = 1)]
        order: usize,
    },
    /// Print the simplified form of an expression
    Simplify {
        /// Expression to simplify
        expression: String,
    },
    /// Evaluate an expression at the given variable values
    Eval {
        /// Expression to evaluate
        expression: String,
        /// Variable values as name=value
        values: Vec<String>,
    },
}

fn main() {
    let args = Args::parse();

    match run(args.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(command: Command) -> Result<String, Box<dyn std::error::Error>> {
    match command {
        Command::Diff {
            expression,
            variable,
            order,
        } => {
            let (expr, names) = parse_with_symbols(&expression)?;
            // A variable that does not occur has a zero derivative
            let derivative = match names.iter().position(|name| *name == variable) {
                Some(index) => expr.pdiff_n(index as u32, order),
                None if order == 0 => expr,
                None => exprfit::Expr::Int(0),
            };
            Ok(derivative.to_string())
        }
        Command::Simplify { expression } => {
            let (expr, _) = parse_with_symbols(&expression)?;
            Ok(expr.simplify().to_string())
        }
        Command::Eval { expression, values } => {
            let (expr, names) = parse_with_symbols(&expression)?;
            let mut input = vec![None; names.len()];
            for pair in &values {
                let (name, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected name=value, got '{}'", pair))?;
                let index = names
                    .iter()
                    .position(|n| n == name.trim())
                    .ok_or_else(|| format!("unknown variable '{}'", name.trim()))?;
                input[index] = Some(value.trim().parse::<f64>()?);
            }
            let input = names
                .iter()
                .zip(input)
                .map(|(name, value)| value.ok_or_else(|| format!("missing value for '{}'", name)))
                .collect::<Result<Vec<f64>, _>>()?;
            Ok(expr.eval(&input)?.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(expression: &str, variable: &str, order: usize) -> String {
        run(Command::Diff {
            expression: expression.to_string(),
            variable: variable.to_string(),
            order,
        })
        .unwrap()
    }

    fn eval(expression: &str, values: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
        run(Command::Eval {
            expression: expression.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        })
    }

    #[test]
    fn test_diff_prints_simplified_derivative() {
        assert_eq!(diff("x*x + y", "x", 1), "x + x");
        assert_eq!(diff("x*x + y", "x", 2), "1 + 1");
        assert_eq!(diff("x*x + y", "y", 1), "1");
        assert_eq!(diff("sin(x)", "x", 4), "sin(x)");
    }

    #[test]
    fn test_diff_order_zero_returns_expression() {
        assert_eq!(diff("x*x + y", "x", 0), "x * x + y");
        assert_eq!(diff("x*x + y", "z", 0), "x * x + y");
    }

    #[test]
    fn test_diff_with_respect_to_absent_variable_is_zero() {
        assert_eq!(diff("x*x + y", "z", 1), "0");
        assert_eq!(diff("x*x + y", "z", 3), "0");
    }

    #[test]
    fn test_simplify_removes_identities() {
        let output = run(Command::Simplify {
            expression: "x*1 + 0*y".to_string(),
        })
        .unwrap();
        assert_eq!(output, "x");
    }

    #[test]
    fn test_eval_binds_values_by_name() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(eval("x*y + 1", &["y=3", "x = 2"])?, "7");
        Ok(())
    }

    #[test]
    fn test_eval_reports_bad_bindings() {
        let missing = eval("x*y", &["x=2"]).unwrap_err();
        assert!(missing.to_string().contains("missing value for 'y'"));

        let unknown = eval("x", &["x=1", "w=2"]).unwrap_err();
        assert!(unknown.to_string().contains("unknown variable 'w'"));

        let malformed = eval("x", &["x"]).unwrap_err();
        assert!(malformed.to_string().contains("expected name=value"));

        assert!(eval("x", &["x=abc"]).is_err());
    }
}
