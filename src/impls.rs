use std::fmt::Display;

pub trait LoggableErrorResult<T> {
    /// Turns the result into an option, writing the error (if any) to the log.
    fn ok_or_log(self) -> Option<T>;
}

impl<T, E: Display> LoggableErrorResult<T> for Result<T, E> {
    fn ok_or_log(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("{}", e);
                None
            }
        }
    }
}

/// Name usable as a single path component, separators and `..` are replaced.
pub fn file_safe(name: &str) -> String {
    let name = name.replace(['/', '\\'], "_");
    if name.is_empty() || name == "." || name == ".." {
        return format!("_{}", name);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_safe_names() {
        assert_eq!(file_safe("Netflix"), "Netflix");
        assert_eq!(file_safe("../etc/passwd"), ".._etc_passwd");
        assert_eq!(file_safe(".."), "_..");
        assert_eq!(file_safe(r"a\b"), "a_b");
    }

    #[test]
    fn ok_or_log_keeps_value() {
        let res: Result<u8, String> = Ok(7);
        assert_eq!(res.ok_or_log(), Some(7));
    }

    #[test]
    fn ok_or_log_swallows_error() {
        let res: Result<u8, String> = Err("boom".into());
        assert_eq!(res.ok_or_log(), None);
    }
}
