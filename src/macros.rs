/// Similar to `info!` macro in tracing.
/// You can pass in the starting time and it will print how long it took from starting time to now.
/// ```
/// # use cardprice::info_time;
/// info_time!("str {}, {}", 1, 2);
/// let time = chrono::Local::now();
/// info_time!(time, "str {}, {}", 1, 2);
/// ```
#[macro_export]
macro_rules! info_time {
    ($strfm:literal $(,)? $($arg:expr),*) => {{
        let local_now = ::chrono::Local::now();
        let res = format!("{:<30} : {}", local_now, format!($strfm, $($arg),*));
        println!("{}", res);
    }};
    ($time:expr, $strfm:literal $(,)? $($arg:expr),*) => {{
        let local_now = ::chrono::Local::now();
        let run_time = (local_now - $time)
                .num_microseconds()
                .map(|n| n as f64 / 1_000_000.0)
                .unwrap_or(0.0);
        let res = format!("{:<30} : {}\nRUNTIME: {} sec", local_now, format!($strfm, $($arg),*), run_time);
        println!("{}", res);
    }};
}

/// Per-card result line on top of `info_time!`: a green `found` or a red `not found`.
/// ```
/// # use cardprice::card_status;
/// card_status!(found, "Lightning Bolt");
/// card_status!(not_found, "Black Lotus");
/// ```
#[macro_export]
macro_rules! card_status {
    (found, $name:expr) => {
        $crate::info_time!("\x1b[92mfound\x1b[0m {}", $name)
    };
    (not_found, $name:expr) => {
        $crate::info_time!("\x1b[91mnot found\x1b[0m {}", $name)
    };
}
