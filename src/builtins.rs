use crate::number::Number;

/// Decimal places kept from trigonometric and hyperbolic results, so that
/// e.g. `sin(pi)` reads as `0.0` instead of `1.2246467991473532e-16`.
pub const TRIG_PRECISION: i32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive on both ends.
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Range(lo, hi) => (lo..=hi).contains(&count),
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        match self {
            Arity::Exact(n) => write!(f, "exactly {n} {}", plural(*n)),
            Arity::AtLeast(n) => write!(f, "at least {n} {}", plural(*n)),
            Arity::Range(lo, hi) => write!(f, "{lo} to {hi} arguments"),
        }
    }
}

/// Why a built-in refused its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    Domain,
    Overflow,
    DivisionByZero,
    NotInteger,
}

pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    apply: fn(&[Number]) -> Result<Number, MathError>,
}

impl Builtin {
    /// `args.len()` must satisfy `self.arity`.
    pub fn call(&self, args: &[Number]) -> Result<Number, MathError> {
        (self.apply)(args)
    }
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<builtin {}/{}>", self.name, self.arity)
    }
}

static BUILTINS: &[Builtin] = &[
    Builtin { name: "abs", arity: Arity::Exact(1), apply: abs },
    Builtin { name: "max", arity: Arity::AtLeast(2), apply: max },
    Builtin { name: "min", arity: Arity::AtLeast(2), apply: min },
    Builtin { name: "round", arity: Arity::Range(1, 2), apply: round },
    Builtin { name: "sin", arity: Arity::Exact(1), apply: |a| trig(a, |x| finite(x).map(f64::sin)) },
    Builtin { name: "cos", arity: Arity::Exact(1), apply: |a| trig(a, |x| finite(x).map(f64::cos)) },
    Builtin { name: "tan", arity: Arity::Exact(1), apply: |a| trig(a, |x| finite(x).map(f64::tan)) },
    Builtin { name: "sinh", arity: Arity::Exact(1), apply: |a| trig(a, |x| overflow_checked(x, x.sinh())) },
    Builtin { name: "cosh", arity: Arity::Exact(1), apply: |a| trig(a, |x| overflow_checked(x, x.cosh())) },
    Builtin { name: "tanh", arity: Arity::Exact(1), apply: |a| trig(a, |x| Ok(x.tanh())) },
    Builtin { name: "asin", arity: Arity::Exact(1), apply: |a| trig(a, |x| unit_interval(x).map(f64::asin)) },
    Builtin { name: "acos", arity: Arity::Exact(1), apply: |a| trig(a, |x| unit_interval(x).map(f64::acos)) },
    Builtin { name: "atan", arity: Arity::Exact(1), apply: |a| trig(a, |x| Ok(x.atan())) },
    Builtin { name: "sqrt", arity: Arity::Exact(1), apply: sqrt },
    Builtin { name: "exp", arity: Arity::Exact(1), apply: |a| real(a, |x| overflow_checked(x, x.exp())) },
    Builtin { name: "log", arity: Arity::Range(1, 2), apply: log },
];

/// Case-insensitive lookup.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name.eq_ignore_ascii_case(name))
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|b| b.name)
}

fn real(args: &[Number], f: impl Fn(f64) -> Result<f64, MathError>) -> Result<Number, MathError> {
    f(args[0].as_f64()).map(Number::Float)
}

fn trig(args: &[Number], f: impl Fn(f64) -> Result<f64, MathError>) -> Result<Number, MathError> {
    real(args, |x| f(x).map(round_trig))
}

fn round_trig(x: f64) -> f64 {
    let scale = 10f64.powi(TRIG_PRECISION);
    let rounded = (x * scale).round_ties_even() / scale;
    if rounded.is_finite() {
        rounded
    } else {
        x
    }
}

fn overflow_checked(input: f64, output: f64) -> Result<f64, MathError> {
    if output.is_infinite() && input.is_finite() {
        Err(MathError::Overflow)
    } else {
        Ok(output)
    }
}

fn finite(x: f64) -> Result<f64, MathError> {
    if x.is_finite() {
        Ok(x)
    } else {
        Err(MathError::Domain)
    }
}

fn unit_interval(x: f64) -> Result<f64, MathError> {
    if (-1.0..=1.0).contains(&x) {
        Ok(x)
    } else {
        Err(MathError::Domain)
    }
}

fn abs(args: &[Number]) -> Result<Number, MathError> {
    Ok(match args[0] {
        Number::Int(i) => i
            .checked_abs()
            .map_or(Number::Float((i as f64).abs()), Number::Int),
        Number::Float(f) => Number::Float(f.abs()),
    })
}

fn max(args: &[Number]) -> Result<Number, MathError> {
    Ok(pick(args, std::cmp::Ordering::Greater))
}

fn min(args: &[Number]) -> Result<Number, MathError> {
    Ok(pick(args, std::cmp::Ordering::Less))
}

// First argument that no later argument beats in direction `wins`.
fn pick(args: &[Number], wins: std::cmp::Ordering) -> Number {
    let mut best = args[0];
    for &arg in &args[1..] {
        if arg.total_cmp(best) == wins {
            best = arg;
        }
    }
    best
}

fn sqrt(args: &[Number]) -> Result<Number, MathError> {
    real(args, |x| if x < 0.0 { Err(MathError::Domain) } else { Ok(x.sqrt()) })
}

fn log(args: &[Number]) -> Result<Number, MathError> {
    let x = args[0].as_f64();
    if x <= 0.0 {
        return Err(MathError::Domain);
    }
    match args.get(1) {
        None => Ok(Number::Float(x.ln())),
        Some(base) => {
            let base = base.as_f64();
            if base <= 0.0 {
                return Err(MathError::Domain);
            }
            let denominator = base.ln();
            if denominator == 0.0 {
                return Err(MathError::DivisionByZero);
            }
            Ok(Number::Float(x.ln() / denominator))
        }
    }
}

/// `round(x)` rounds half to even and yields an integer; `round(x, n)` keeps
/// the type of `x` and accepts a negative `n`.
fn round(args: &[Number]) -> Result<Number, MathError> {
    match (args[0], args.get(1)) {
        (Number::Int(i), None) => Ok(Number::Int(i)),
        (Number::Float(f), None) => {
            if !f.is_finite() {
                return Err(MathError::Domain);
            }
            let r = f.round_ties_even();
            if r >= i64::MIN as f64 && r < i64::MAX as f64 {
                Ok(Number::Int(r as i64))
            } else {
                Ok(Number::Float(r))
            }
        }
        (x, Some(Number::Int(digits))) => Ok(round_digits(x, *digits)),
        (_, Some(Number::Float(_))) => Err(MathError::NotInteger),
    }
}

fn round_digits(x: Number, digits: i64) -> Number {
    match x {
        Number::Int(i) if digits >= 0 => Number::Int(i),
        Number::Int(i) => {
            // Beyond 10^38 every i64 rounds to zero.
            let pow = digits
                .checked_neg()
                .and_then(|d| u32::try_from(d).ok())
                .and_then(|e| 10i128.checked_pow(e));
            let Some(pow) = pow else {
                return Number::Int(0);
            };
            let quot = (i as i128).div_euclid(pow);
            let rem = (i as i128).rem_euclid(pow);
            let quot = if rem > pow - rem || (rem == pow - rem && quot % 2 != 0) {
                quot + 1
            } else {
                quot
            };
            let rounded = quot * pow;
            i64::try_from(rounded).map_or(Number::Float(rounded as f64), Number::Int)
        }
        Number::Float(f) if !f.is_finite() => Number::Float(f),
        Number::Float(f) => {
            let exp = digits.clamp(-400, 400) as i32;
            let rounded = if exp >= 0 {
                let scale = 10f64.powi(exp);
                let scaled = f * scale;
                if scaled.is_finite() {
                    scaled.round_ties_even() / scale
                } else {
                    f
                }
            } else {
                let scale = 10f64.powi(-exp);
                if scale.is_finite() {
                    (f / scale).round_ties_even() * scale
                } else {
                    0.0f64.copysign(f)
                }
            };
            Number::Float(rounded)
        }
    }
}
