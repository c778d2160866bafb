//! Implementations of the built-in functions.
//!
//! Arity has already been validated by the registry before these run, so
//! indexing into `args` up to the declared arity is safe.

use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::SystemTime;

use rand::{Rng, SeedableRng};
use sha1::Digest;

use crate::env::fuzzing;
use crate::errors::EvalError;

use super::CallResult;

fn parse_int(name: &str, value: &str) -> Result<i64, EvalError> {
    value.trim().parse::<i64>().map_err(|_| EvalError::NotAnInteger {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn mtime(name: &str, path: &str) -> Result<SystemTime, EvalError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| EvalError::Stat {
            name: name.to_string(),
            path: path.to_string(),
            source,
        })
}

fn run_shell(command: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

pub fn contains(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(args[0].contains(args[1].as_str())))
}

pub fn empty(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(args[0].is_empty()))
}

pub fn nonempty(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(!args[0].is_empty()))
}

pub fn equal(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(args[0] == args[1]))
}

pub fn exists(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(Path::new(&args[0]).exists()))
}

/// True iff the command exits non-zero or cannot be launched. Benign false
/// under the FUZZ valve.
pub fn failure(args: &[String]) -> Result<CallResult, EvalError> {
    if fuzzing() {
        return Ok(CallResult::Bool(false));
    }
    Ok(CallResult::Bool(!run_shell(&args[0])))
}

/// Complement of `failure`. Benign true under the FUZZ valve.
pub fn success(args: &[String]) -> Result<CallResult, EvalError> {
    if fuzzing() {
        return Ok(CallResult::Bool(true));
    }
    Ok(CallResult::Bool(run_shell(&args[0])))
}

/// Zero-indexed whitespace-separated field, "" when out of range.
pub fn field(args: &[String]) -> Result<CallResult, EvalError> {
    let index = parse_int("field", &args[1])?;
    let fields: Vec<&str> = args[0].split_whitespace().collect();
    let value = if index >= 0 && (index as usize) < fields.len() {
        fields[index as usize].to_string()
    } else {
        String::new()
    };
    Ok(CallResult::Str(value))
}

pub fn gt(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(
        parse_int("gt", &args[0])? > parse_int("gt", &args[1])?,
    ))
}

pub fn gte(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(
        parse_int("gte", &args[0])? >= parse_int("gte", &args[1])?,
    ))
}

pub fn lt(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(
        parse_int("lt", &args[0])? < parse_int("lt", &args[1])?,
    ))
}

pub fn lte(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(
        parse_int("lte", &args[0])? <= parse_int("lte", &args[1])?,
    ))
}

/// Unicode code-point count.
pub fn len(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Number(args[0].chars().count() as i64))
}

pub fn lower(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Str(args[0].to_lowercase()))
}

pub fn upper(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Str(args[0].to_uppercase()))
}

pub fn matches(args: &[String]) -> Result<CallResult, EvalError> {
    let re = regex_lite::Regex::new(&args[1]).map_err(|e| EvalError::BadRegex {
        pattern: args[1].clone(),
        reason: e.to_string(),
    })?;
    Ok(CallResult::Bool(re.is_match(&args[0])))
}

pub fn md5_digest(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Str(format!(
        "{:x}",
        md5::compute(args[0].as_bytes())
    )))
}

pub fn sha1_digest(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Str(hex::encode(sha1::Sha1::digest(
        args[0].as_bytes(),
    ))))
}

pub fn on_path(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(which::which(&args[0]).is_ok()))
}

/// Emit the message, then read one trimmed line from stdin.
pub fn prompt(args: &[String]) -> Result<CallResult, EvalError> {
    print!("{} ", args[0]);
    std::io::stdout()
        .flush()
        .map_err(|e| EvalError::Prompt(e.to_string()))?;

    let mut line = String::new();
    let read = std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| EvalError::Prompt(e.to_string()))?;
    if read == 0 {
        return Err(EvalError::Prompt("unexpected end of input".to_string()));
    }
    Ok(CallResult::Str(line.trim().to_string()))
}

/// Pseudo-random integer in [low, high]; reproducible for a given seed.
pub fn rand_range(args: &[String]) -> Result<CallResult, EvalError> {
    let low = parse_int("rand", &args[0])?;
    let high = parse_int("rand", &args[1])?;
    if low > high {
        return Err(EvalError::EmptyRange { low, high });
    }

    let value = if args.len() == 3 {
        let seed = parse_int("rand", &args[2])?;
        rand::rngs::StdRng::seed_from_u64(seed as u64).gen_range(low..=high)
    } else {
        rand::thread_rng().gen_range(low..=high)
    };
    Ok(CallResult::Number(value))
}

/// True iff the first path was modified more recently than the second.
pub fn newer(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(
        mtime("newer", &args[0])? > mtime("newer", &args[1])?,
    ))
}

/// True iff the first path was modified less recently than the second.
pub fn older(args: &[String]) -> Result<CallResult, EvalError> {
    Ok(CallResult::Bool(
        mtime("older", &args[0])? < mtime("older", &args[1])?,
    ))
}
