/*!

  Utils for logic-net development.

*/

/// Compare Verilog as strings up to indentation.
#[macro_export]
macro_rules! assert_verilog_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                assert_eq!(
                    left_val.lines().count(),
                    right_val.lines().count(),
                    "line counts differ"
                );
                for (left_line, right_line) in left_val.lines().zip(right_val.lines()) {
                    assert_eq!(left_line.trim(), right_line.trim());
                }
            }
        }
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                assert_eq!(
                    left_val.lines().count(),
                    right_val.lines().count(),
                    "line counts differ: {}",
                    std::format_args!($($arg)+)
                );
                for (left_line, right_line) in left_val.lines().zip(right_val.lines()) {
                    assert_eq!(
                        left_line.trim(),
                        right_line.trim(),
                        "{}",
                        std::format_args!($($arg)+)
                    );
                }
            }
        }
    };
}

/// Format an [Identifier](crate::circuit::Identifier) like `format!`.
#[macro_export]
macro_rules! format_id {
    ($($arg:tt)*) => {
        $crate::circuit::Identifier::new(format!($($arg)*))
    };
}
