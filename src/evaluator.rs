use log::debug;

use crate::{
    ast::Node,
    builtins::{self, MathError},
    env::{Bindings, Environment},
    error::Error,
    lexer::Op,
    number::{self, Number},
};

/// Tree-walking evaluator. Variables assigned through it persist for its
/// whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    env: Environment,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Default constants extended or replaced by `overrides`.
    pub fn with_constants<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, Number)>,
        S: AsRef<str>,
    {
        Self {
            env: Environment::with_constants(overrides),
        }
    }

    pub fn with_env(env: Environment) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn variables(&self) -> &Bindings {
        &self.env.variables
    }

    /// Direct access to the variable table. Writes made here bypass the
    /// protected-name check.
    pub fn variables_mut(&mut self) -> &mut Bindings {
        &mut self.env.variables
    }

    /// Binds `name` to `value` while `f` runs, then restores whatever was
    /// bound before.
    pub fn with_binding<T>(
        &mut self,
        name: &str,
        value: Number,
        f: impl FnOnce(&mut Self) -> T,
    ) -> Result<T, Error> {
        if self.env.is_protected(name) {
            return Err(Error::eval_unplaced(format!(
                "cannot bind protected name '{name}'"
            )));
        }
        let previous = self.env.variables.insert(name, value);
        let result = f(self);
        self.env.variables.restore(name, previous);
        Ok(result)
    }

    pub fn eval(&mut self, node: &Node) -> Result<Number, Error> {
        match node {
            Node::Number { value, .. } => Ok(*value),

            Node::Name { name, offset } => self.env.lookup(name).ok_or_else(|| {
                Error::name(format!("unknown name '{name}'"), *offset, name.len())
            }),

            Node::Assign {
                name,
                value,
                offset,
            } => {
                // The right-hand side runs first; its own assignments stick
                // even when this one is rejected.
                let value = self.eval(value)?;
                if self.env.is_protected(name) {
                    return Err(Error::eval(
                        format!("cannot assign to protected name '{name}'"),
                        *offset,
                    ));
                }
                debug!("{} = {value}", name.to_lowercase());
                self.env.variables.insert(name, value);
                Ok(value)
            }

            Node::Unary {
                op,
                operand,
                offset,
            } => {
                let value = self.eval(operand)?;
                match op {
                    Op::Plus => Ok(value),
                    Op::Minus => Ok(number::negate(value)),
                    _ => Err(Error::eval(
                        format!("internal error: unsupported unary operator '{op}'"),
                        *offset,
                    )),
                }
            }

            Node::Binary {
                op,
                left,
                right,
                offset,
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                let result = match op {
                    Op::Plus => Ok(number::add(left, right)),
                    Op::Minus => Ok(number::minus(left, right)),
                    Op::Star => Ok(number::mult(left, right)),
                    Op::Slash => number::div(left, right),
                    Op::DoubleSlash => number::floor_div(left, right),
                    Op::Percent => number::modulo(left, right),
                    Op::DoubleStar => number::expt(left, right),
                };
                let result = result.map_err(|err| place(err, *offset))?;
                if result.is_nan() {
                    return Err(Error::eval(
                        format!("result of '{op}' is not a real number"),
                        *offset,
                    ));
                }
                Ok(result)
            }

            Node::Call { name, args, offset } => self.call(name, args, *offset),

            Node::Plot(command) => Err(Error::eval(
                "'plot' is a command, not a numeric expression",
                command.offset,
            )),
            Node::Simplify { offset, .. } => Err(Error::eval(
                "'simplify' is a command, not a numeric expression",
                *offset,
            )),
        }
    }

    fn call(&mut self, name: &str, args: &[Node], offset: usize) -> Result<Number, Error> {
        let Some(builtin) = builtins::lookup(name) else {
            return Err(Error::name(
                format!("unknown function '{name}'"),
                offset,
                name.len(),
            ));
        };

        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;

        if !builtin.arity.accepts(values.len()) {
            return Err(Error::eval(
                format!(
                    "function '{}' expects {}, got {}",
                    builtin.name,
                    builtin.arity,
                    values.len()
                ),
                offset,
            ));
        }

        debug!("calling {builtin:?} with {values:?}");
        let result = builtin.call(&values).map_err(|err| {
            let message = match err {
                MathError::Domain => format!("arguments out of domain for '{}'", builtin.name),
                MathError::Overflow => format!("result of '{}' out of range", builtin.name),
                MathError::NotInteger => {
                    format!("'{}' expects an integer number of digits", builtin.name)
                }
                MathError::DivisionByZero => return Error::DivisionByZero,
            };
            Error::eval(message, offset)
        })?;

        if result.is_nan() {
            return Err(Error::eval(
                format!("'{}' produced a result that is not a real number", builtin.name),
                offset,
            ));
        }
        Ok(result)
    }
}

// Operator errors are raised without a position; pin them to the operator.
fn place(err: Error, offset: usize) -> Error {
    match err {
        Error::Eval { message, span: None } => Error::eval(message, offset),
        other => other,
    }
}

/// Parses and evaluates `source` in a fresh evaluator.
pub fn eval_expr<I, S>(source: &str, overrides: I) -> Result<Number, Error>
where
    I: IntoIterator<Item = (S, Number)>,
    S: AsRef<str>,
{
    let node = crate::parser::parse(source)?;
    Evaluator::with_constants(overrides).eval(&node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn eval_in(evaluator: &mut Evaluator, input: &str) -> Result<Number, Error> {
        evaluator.eval(&parse(input).unwrap())
    }

    fn eval(input: &str) -> Result<Number, Error> {
        eval_in(&mut Evaluator::new(), input)
    }

    fn eval_f64(input: &str) -> f64 {
        eval(input).unwrap().as_f64()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2+2*2"), Ok(Number::Int(6)));
        assert_eq!(eval("(2+2)*2"), Ok(Number::Int(8)));
        assert_eq!(eval("2**3**2"), Ok(Number::Int(512)));
        assert_eq!(eval("-3**2"), Ok(Number::Int(-9)));
        assert_eq!(eval("(-3)**2"), Ok(Number::Int(9)));
        assert_eq!(eval("2*(3+(4-1))"), Ok(Number::Int(12)));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("10/4"), Ok(Number::Float(2.5)));
        assert_eq!(eval("7//3"), Ok(Number::Int(2)));
        assert_eq!(eval("10%4"), Ok(Number::Int(2)));
        assert_eq!(eval("-7 % 3"), Ok(Number::Int(2)));
        assert_eq!(eval("+5"), Ok(Number::Int(5)));
    }

    #[test]
    fn test_division_by_zero() {
        for input in ["1/0", "1//0", "1%0", "1/0.0", "0**-1", "log(8, 1)"] {
            assert_eq!(eval(input), Err(Error::DivisionByZero), "{input}");
        }
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(eval("1_000 + 2_000"), Ok(Number::Int(3000)));
        assert_close(eval_f64("1e-3 + .5"), 0.501);
    }

    #[test]
    fn test_constants() {
        assert_eq!(eval("pi"), Ok(Number::Float(std::f64::consts::PI)));
        assert_close(
            eval_f64("2*pi + tau/2"),
            2.0 * std::f64::consts::PI + std::f64::consts::TAU / 2.0,
        );
        assert_close(eval_f64("PHI"), 1.618033988749895);
    }

    #[test]
    fn test_constant_overrides() {
        let result = eval_expr("g * 2", [("g", Number::Float(9.81))]);
        assert_eq!(result, Ok(Number::Float(19.62)));

        let mut evaluator = Evaluator::with_constants([("PI", Number::Int(3))]);
        assert_eq!(eval_in(&mut evaluator, "pi"), Ok(Number::Int(3)));
        assert!(matches!(
            eval_in(&mut evaluator, "g = 1"),
            Ok(Number::Int(1))
        ));
    }

    #[test]
    fn test_unknown_name() {
        let err = eval("1 + Foo").unwrap_err();
        assert!(matches!(err, Error::NameResolution { .. }));
        assert!(err.to_string().contains("Foo"));
        assert_eq!(err.offset(), Some(4));
    }

    #[test]
    fn test_assignment() {
        let mut evaluator = Evaluator::new();
        assert_eq!(eval_in(&mut evaluator, "x = 10"), Ok(Number::Int(10)));
        assert_eq!(eval_in(&mut evaluator, "X"), Ok(Number::Int(10)));
        assert_eq!(eval_in(&mut evaluator, "x = x + 1"), Ok(Number::Int(11)));
        assert_eq!(eval_in(&mut evaluator, "a = b = 3"), Ok(Number::Int(3)));
        assert_eq!(evaluator.variables().get("A"), Some(Number::Int(3)));
        assert_eq!(evaluator.variables().get("b"), Some(Number::Int(3)));
    }

    #[test]
    fn test_protected_assignment() {
        let mut evaluator = Evaluator::new();
        for input in ["pi = 3", "PI = 3", "sin = 1", "Max = 2"] {
            let err = eval_in(&mut evaluator, input).unwrap_err();
            assert!(matches!(err, Error::Eval { .. }), "{input}");
            assert!(err.to_string().contains("protected"), "{input}");
        }
        assert_eq!(eval_in(&mut evaluator, "pi"), Ok(Number::Float(std::f64::consts::PI)));
    }

    #[test]
    fn test_failed_assignment_keeps_inner_side_effects() {
        let mut evaluator = Evaluator::new();
        assert!(eval_in(&mut evaluator, "pi = y = 4").is_err());
        assert_eq!(evaluator.variables().get("y"), Some(Number::Int(4)));
    }

    #[test]
    fn test_functions() {
        assert_close(eval_f64("sin(pi)"), 0.0);
        assert_close(eval_f64("log(100,10)"), 2.0);
        assert_eq!(eval("abs(-3**2)"), Ok(Number::Int(9)));
        assert_eq!(eval("max(1,5,2,3)"), Ok(Number::Int(5)));
        assert_eq!(eval("MIN(4, -2)"), Ok(Number::Int(-2)));
        assert_eq!(eval("round(3.1415,2)"), Ok(Number::Float(3.14)));
        assert_close(eval_f64("abs(sin(pi))"), 0.0);
        assert_close(eval_f64("2+sqrt(16)*3"), 14.0);
        assert_close(eval_f64("exp(0) + log(e)"), 2.0);
        assert_close(eval_f64("atan(1) * 4"), std::f64::consts::PI);
    }

    #[test]
    fn test_arity_errors() {
        for input in ["max(1)", "sin(1,2)", "log(1,2,3)", "round()", "abs()"] {
            let err = eval(input).unwrap_err();
            assert!(matches!(err, Error::Eval { .. }), "{input}");
            assert!(err.to_string().contains("expects"), "{input}");
        }
        assert_eq!(
            eval("max(1)").unwrap_err().to_string(),
            "function 'max' expects at least 2 arguments, got 1"
        );
    }

    #[test]
    fn test_unknown_function() {
        assert!(matches!(
            eval("foo(1)"),
            Err(Error::NameResolution { .. })
        ));
    }

    #[test]
    fn test_arguments_evaluate_before_arity_check() {
        assert!(matches!(
            eval("sin(nope, 2)"),
            Err(Error::NameResolution { .. })
        ));
        assert_eq!(eval("max(1/0)"), Err(Error::DivisionByZero));
    }

    #[test]
    fn test_domain_and_nan_errors() {
        let err = eval("asin(2)").unwrap_err();
        assert!(err.to_string().contains("out of domain"));
        assert!(matches!(eval("sqrt(-1)"), Err(Error::Eval { .. })));
        assert!(matches!(eval("(-8) ** 0.5"), Err(Error::Eval { .. })));
        let err = eval("sin(1e400)").unwrap_err();
        assert!(err.to_string().contains("out of domain"), "{err}");
        assert!(eval("tan(-1e400)").unwrap_err().to_string().contains("out of domain"));
        assert!(matches!(eval("exp(1000)"), Err(Error::Eval { .. })));
        let err = eval("1 + 10.0 ** 400").unwrap_err();
        assert_eq!(err.offset(), Some(9));
    }

    #[test]
    fn test_commands_are_not_numeric() {
        for input in ["plot sin(x)", "simplify x + x"] {
            let err = eval(input).unwrap_err();
            assert!(err.to_string().contains("not a numeric expression"), "{input}");
            assert_eq!(err.offset(), Some(0));
            assert!(parse(input).unwrap().is_command());
        }
        assert!(!parse("plot = 1").unwrap().is_command());
    }

    #[test]
    fn test_shared_environment() {
        let mut env = Environment::with_constants([("g", Number::Float(9.81))]);
        env.variables.insert("m", Number::Int(2));

        let mut evaluator = Evaluator::with_env(env);
        assert_eq!(eval_in(&mut evaluator, "m * g"), Ok(Number::Float(19.62)));
        assert!(evaluator.env().is_protected("G"));
        assert_eq!(evaluator.env().constants().get("g"), Some(Number::Float(9.81)));
        assert!(eval_in(&mut evaluator, "g = 1").is_err());

        assert!(Evaluator::new().variables().is_empty());
        eval_in(&mut evaluator, "h = 3").unwrap();
        assert_eq!(evaluator.variables().len(), 2);
    }

    #[test]
    fn test_with_binding_restores() {
        let mut evaluator = Evaluator::new();
        let node = parse("x ** 2").unwrap();

        let squared = evaluator
            .with_binding("x", Number::Int(3), |ev| ev.eval(&node))
            .unwrap();
        assert_eq!(squared, Ok(Number::Int(9)));
        assert!(!evaluator.variables().contains("x"));

        evaluator.variables_mut().insert("x", Number::Int(1));
        evaluator
            .with_binding("X", Number::Int(5), |ev| ev.eval(&node))
            .unwrap()
            .unwrap();
        assert_eq!(evaluator.variables().get("x"), Some(Number::Int(1)));

        assert!(evaluator
            .with_binding("pi", Number::Int(0), |_| ())
            .is_err());
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let mut evaluator = Evaluator::new();
        eval_in(&mut evaluator, "k = 3").unwrap();
        let node = parse("k * cos(pi / k) + 7 // 2").unwrap();
        let first = evaluator.eval(&node);
        let second = evaluator.eval(&node);
        assert_eq!(first, second);
    }
}
