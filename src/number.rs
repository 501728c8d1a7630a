use std::cmp::Ordering;
use std::fmt;

use crate::error::Error;

/// A value of the language: an exact integer or a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Number::Float(f) if f.is_nan())
    }

    /// Integral floats become integers, everything else is unchanged.
    pub fn normalized(self) -> Number {
        match self {
            Number::Float(f)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                Number::Int(f as i64)
            }
            n => n,
        }
    }

    pub fn total_cmp(self, other: Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        }
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Number::Int(i)
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Number::Float(f)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            // Debug keeps a trailing `.0` and switches to exponent form for
            // very large and very small magnitudes.
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

pub fn add(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_add(y)
            .map_or(Number::Float(x as f64 + y as f64), Number::Int),
        _ => Number::Float(a.as_f64() + b.as_f64()),
    }
}

pub fn minus(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_sub(y)
            .map_or(Number::Float(x as f64 - y as f64), Number::Int),
        _ => Number::Float(a.as_f64() - b.as_f64()),
    }
}

pub fn mult(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_mul(y)
            .map_or(Number::Float(x as f64 * y as f64), Number::Int),
        _ => Number::Float(a.as_f64() * b.as_f64()),
    }
}

pub fn negate(a: Number) -> Number {
    match a {
        Number::Int(x) => x.checked_neg().map_or(Number::Float(-(x as f64)), Number::Int),
        Number::Float(x) => Number::Float(-x),
    }
}

/// True division, always a float.
pub fn div(a: Number, b: Number) -> Result<Number, Error> {
    if b.is_zero() {
        return Err(Error::DivisionByZero);
    }
    Ok(Number::Float(a.as_f64() / b.as_f64()))
}

/// Division rounded towards negative infinity.
pub fn floor_div(a: Number, b: Number) -> Result<Number, Error> {
    if b.is_zero() {
        return Err(Error::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_div(y) {
            Some(q) if x % y != 0 && (x < 0) != (y < 0) => Ok(Number::Int(q - 1)),
            Some(q) => Ok(Number::Int(q)),
            None => Ok(Number::Float(float_divmod(x as f64, y as f64).0)),
        },
        _ => Ok(Number::Float(float_divmod(a.as_f64(), b.as_f64()).0)),
    }
}

/// Remainder carrying the sign of the divisor, consistent with [`floor_div`].
pub fn modulo(a: Number, b: Number) -> Result<Number, Error> {
    if b.is_zero() {
        return Err(Error::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            let r = x.checked_rem(y).unwrap_or(0);
            if r != 0 && (r < 0) != (y < 0) {
                Ok(Number::Int(r + y))
            } else {
                Ok(Number::Int(r))
            }
        }
        _ => Ok(Number::Float(float_divmod(a.as_f64(), b.as_f64()).1)),
    }
}

// Floor quotient and divisor-signed remainder for floats, `b != 0`.
fn float_divmod(a: f64, b: f64) -> (f64, f64) {
    let mut rem = a % b;
    let mut quot = (a - rem) / b;
    if rem != 0.0 {
        if (b < 0.0) != (rem < 0.0) {
            rem += b;
            quot -= 1.0;
        }
    } else {
        rem = 0.0_f64.copysign(b);
    }
    let floor = if quot != 0.0 {
        let f = quot.floor();
        if quot - f > 0.5 {
            f + 1.0
        } else {
            f
        }
    } else {
        0.0_f64.copysign(a / b)
    };
    (floor, rem)
}

/// Exponentiation. Integer base and non-negative integer exponent stay exact
/// while the result fits.
pub fn expt(a: Number, b: Number) -> Result<Number, Error> {
    if let (Number::Int(base), Number::Int(exp)) = (a, b) {
        if exp >= 0 {
            if let Some(n) = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
                return Ok(Number::Int(n));
            }
        }
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    if x == 0.0 && y < 0.0 {
        return Err(Error::DivisionByZero);
    }
    let result = x.powf(y);
    if result.is_infinite() && x.is_finite() && y.is_finite() {
        return Err(Error::eval_unplaced("numeric overflow in exponentiation"));
    }
    Ok(Number::Float(result))
}
