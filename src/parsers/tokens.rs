//! # 数值词元修复与解析
//!
//! VASP 的 Fortran 定宽输出在负数前经常没有空格（如 `1.23-4.56`）。
//! `repair` 在每个前面不是空白的 `-` 前插入空格，再按空白拆分。
//!
//! 注意：指数中的负号（`1.0E-03`）同样会被拆开，所以只对定点格式的
//! 字段使用 `tokens`；带指数的字段请用 `raw_tokens`。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/` 下所有提取器使用
//! - 使用 `thiserror` 派生 `TokenError`

use thiserror::Error;

/// 单个词元无法转换为数值
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert '{token}' to a number")]
pub struct TokenError {
    pub token: String,
}

/// 在粘连的负号前插入空格
pub fn repair(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut previous: Option<char> = None;
    for c in line.chars() {
        if c == '-' {
            if let Some(p) = previous {
                if !p.is_whitespace() {
                    out.push(' ');
                }
            }
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

/// 修剪、修复后按空白拆分
pub fn tokens(line: &str) -> Vec<String> {
    repair(line.trim())
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// 不做修复，直接按空白拆分
pub fn raw_tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// 解析一个数值词元
pub fn parse_float(token: &str) -> Result<f64, TokenError> {
    token.parse::<f64>().map_err(|_| TokenError {
        token: token.to_string(),
    })
}

/// 解析一条记录的全部词元，任何一个失败则整条记录失败
pub fn parse_floats<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<f64>, TokenError> {
    tokens.iter().map(|t| parse_float(t.as_ref())).collect()
}

/// 取出 `[start, start + count)` 位置的字段并解析；字段不足也视为失败
pub fn parse_float_fields<S: AsRef<str>>(
    tokens: &[S],
    start: usize,
    count: usize,
) -> Result<Vec<f64>, TokenError> {
    match tokens.get(start..start + count) {
        Some(fields) => parse_floats(fields),
        None => Err(TokenError {
            token: format!(
                "<{} fields from position {}, line has {}>",
                count,
                start,
                tokens.len()
            ),
        }),
    }
}

/// 取倒数第 `back` 个词元并解析
pub fn parse_from_end<S: AsRef<str>>(tokens: &[S], back: usize) -> Result<f64, TokenError> {
    if back == 0 || back > tokens.len() {
        return Err(TokenError {
            token: format!("<field -{} of {}>", back, tokens.len()),
        });
    }
    parse_float(tokens[tokens.len() - back].as_ref())
}

/// 解析固定长度的三分量记录
pub fn parse_vec3<S: AsRef<str>>(tokens: &[S], start: usize) -> Result<[f64; 3], TokenError> {
    let v = parse_float_fields(tokens, start, 3)?;
    Ok([v[0], v[1], v[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_concatenated_negatives() {
        assert_eq!(repair("1.23-4.56"), "1.23 -4.56");
        assert_eq!(repair("-1.0-2.0-3.0"), "-1.0 -2.0 -3.0");
        assert_eq!(repair("  -1.0  -2.0"), "  -1.0  -2.0");
    }

    #[test]
    fn test_tokens_after_repair() {
        let t = tokens("   3.87720-4.01520      4.00000   ");
        assert_eq!(t, vec!["3.87720", "-4.01520", "4.00000"]);
    }

    #[test]
    fn test_parse_floats_fails_per_record() {
        assert_eq!(parse_floats(&["1.0", "-2.5"]).unwrap(), vec![1.0, -2.5]);
        let err = parse_floats(&["1.0", "abc"]).unwrap_err();
        assert_eq!(err.token, "abc");
        assert_eq!(err.to_string(), "cannot convert 'abc' to a number");
    }

    #[test]
    fn test_parse_float_fields_bounds() {
        let t = tokens("in kB  1.0 2.0 3.0 4.0 5.0 6.0");
        assert_eq!(
            parse_float_fields(&t, 2, 6).unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
        assert!(parse_float_fields(&t, 4, 6).is_err());
    }

    #[test]
    fn test_parse_from_end() {
        let t = tokens("free  energy   TOTEN  =       -19.26550806 eV");
        assert_eq!(parse_from_end(&t, 2).unwrap(), -19.26550806);
        assert!(parse_from_end(&t, 1).is_err());
        assert!(parse_from_end(&t, 0).is_err());
        assert!(parse_from_end::<String>(&[], 1).is_err());
    }

    #[test]
    fn test_fortran_trailing_dot() {
        assert_eq!(parse_float("123456.").unwrap(), 123456.0);
    }
}
