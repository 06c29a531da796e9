use crate::error::EvalError;
use crate::runtime::value::Value;
use super::{Export, NamespaceProvider, constant, func, func_range, number_arg};

const UNARY: &[&str] = &[
    "abs", "acos", "acosh", "asin", "asinh", "atan", "atanh", "cbrt", "ceil", "cos", "cosh",
    "exp", "expm1", "floor", "fround", "log", "log1p", "log10", "log2", "round", "sign",
    "sin", "sinh", "sqrt", "tan", "tanh", "trunc",
];

pub struct MathNamespace;

impl NamespaceProvider for MathNamespace {
    fn name(&self) -> &'static str { "math" }

    fn exports(&self) -> Vec<Export> {
        use std::f64::consts;

        let mut out: Vec<Export> = UNARY.iter().map(|&name| func(name, 1)).collect();
        out.extend([
            func("atan2", 2), func("pow", 2), func("imul", 2),
            func_range("max", 0, usize::MAX),
            func_range("min", 0, usize::MAX),
            func_range("hypot", 0, usize::MAX),
            func("random", 0),
            constant("E", consts::E),
            constant("LN2", consts::LN_2),
            constant("LN10", consts::LN_10),
            constant("LOG2E", consts::LOG2_E),
            constant("LOG10E", consts::LOG10_E),
            constant("PI", consts::PI),
            constant("SQRT1_2", consts::FRAC_1_SQRT_2),
            constant("SQRT2", consts::SQRT_2),
        ]);
        out
    }

    fn call(&self, name: &str, args: &[Value], line: usize) -> Result<Option<Value>, EvalError> {
        let n = match name {
            "atan2" => number_arg(args, 0, line)?.atan2(number_arg(args, 1, line)?),
            "pow"   => number_arg(args, 0, line)?.powf(number_arg(args, 1, line)?),
            "imul"  => {
                let a = to_int32(number_arg(args, 0, line)?);
                let b = to_int32(number_arg(args, 1, line)?);
                a.wrapping_mul(b) as f64
            }
            "max" => numbers(args, line)?.into_iter().fold(f64::NEG_INFINITY, |acc, x| {
                if acc.is_nan() || x.is_nan() { f64::NAN } else { acc.max(x) }
            }),
            "min" => numbers(args, line)?.into_iter().fold(f64::INFINITY, |acc, x| {
                if acc.is_nan() || x.is_nan() { f64::NAN } else { acc.min(x) }
            }),
            "hypot" => numbers(args, line)?.into_iter().map(|x| x * x).sum::<f64>().sqrt(),
            "random" => rand::random::<f64>(),
            _ => match unary(name) {
                Some(f) => f(number_arg(args, 0, line)?),
                None => return Ok(None),
            },
        };
        Ok(Some(Value::Number(n)))
    }
}

fn numbers(args: &[Value], line: usize) -> Result<Vec<f64>, EvalError> {
    (0..args.len()).map(|i| number_arg(args, i, line)).collect()
}

fn unary(name: &str) -> Option<fn(f64) -> f64> {
    let f: fn(f64) -> f64 = match name {
        "abs"    => f64::abs,
        "acos"   => f64::acos,
        "acosh"  => f64::acosh,
        "asin"   => f64::asin,
        "asinh"  => f64::asinh,
        "atan"   => f64::atan,
        "atanh"  => f64::atanh,
        "cbrt"   => f64::cbrt,
        "ceil"   => f64::ceil,
        "cos"    => f64::cos,
        "cosh"   => f64::cosh,
        "exp"    => f64::exp,
        "expm1"  => f64::exp_m1,
        "floor"  => f64::floor,
        "fround" => |x| x as f32 as f64,
        "log"    => f64::ln,
        "log1p"  => f64::ln_1p,
        "log10"  => f64::log10,
        "log2"   => f64::log2,
        "round"  => round_half_up,
        "sign"   => |x| if x == 0.0 || x.is_nan() { x } else { x.signum() },
        "sin"    => f64::sin,
        "sinh"   => f64::sinh,
        "sqrt"   => f64::sqrt,
        "tan"    => f64::tan,
        "tanh"   => f64::tanh,
        "trunc"  => f64::trunc,
        _ => return None,
    };
    Some(f)
}

/// Ties go toward positive infinity: `-2.5` rounds to `-2`.
pub(crate) fn round_half_up(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

/// Modular conversion to a signed 32-bit integer; non-finite values become 0.
fn to_int32(x: f64) -> i32 {
    if !x.is_finite() {
        return 0;
    }
    x.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
}

// ─── Tests ───────────────────────────────────────────────────────────────────
