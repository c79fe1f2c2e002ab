#[macro_export]
macro_rules! eeprintln {
    ($($arg:tt)*) => {{
        // Git Bash on Windows drops stderr when piped
        if *$crate::print::IS_GIT_BASH {
            println!("{}", format_args!($($arg)*));
        } else {
            eprintln!("{}", format_args!($($arg)*));
        }
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($sink:ident, $kind:ident, $print:expr, $($arg:tt)*) => {{
        let msg = format!("{}", format_args!($($arg)*));
        let redacted = $crate::print::auto_redact(&msg);
        if $crate::print::is_print() {
            $print(&redacted);
        }
        $crate::print::$sink(&redacted, $crate::print::LogType::$kind);
    }};
}

/// Print an informational message
#[macro_export]
macro_rules! info {
    (no_log, $($arg:tt)*) => {
        $crate::__log_line!(print_to_memory, Info, |m: &str| {
            println!("{} {m}", $crate::owo_colors::OwoColorize::yellow(&"[info]"))
        }, $($arg)*)
    };
    ($($arg:tt)*) => {
        $crate::__log_line!(print_to_file, Info, |m: &str| {
            println!("{} {m}", $crate::owo_colors::OwoColorize::yellow(&"[info]"))
        }, $($arg)*)
    };
}

/// Print an error message
#[macro_export]
macro_rules! err {
    (no_log, $($arg:tt)*) => {
        $crate::__log_line!(print_to_memory, Error, |m: &str| {
            $crate::eeprintln!("{} {m}", $crate::owo_colors::OwoColorize::red(&"[error]"))
        }, $($arg)*)
    };
    ($($arg:tt)*) => {
        $crate::__log_line!(print_to_file, Error, |m: &str| {
            $crate::eeprintln!("{} {m}", $crate::owo_colors::OwoColorize::red(&"[error]"))
        }, $($arg)*)
    };
}

/// Print a point message, i.e. a small step in some process
#[macro_export]
macro_rules! pt {
    (no_log, $($arg:tt)*) => {
        $crate::__log_line!(print_to_memory, Point, |m: &str| {
            println!("{} {m}", $crate::owo_colors::OwoColorize::bold(&"-"))
        }, $($arg)*)
    };
    ($($arg:tt)*) => {
        $crate::__log_line!(print_to_file, Point, |m: &str| {
            println!("{} {m}", $crate::owo_colors::OwoColorize::bold(&"-"))
        }, $($arg)*)
    };
}
