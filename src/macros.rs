macro_rules! emit {
    ($output:expr, $opcode:expr) => {
        writeln!($output, "{}", $opcode)
    };

    ($output:expr, $opcode:expr, $($format:tt)*) => {{
        write!($output, "{} ", $opcode)?;
        writeln!($output, $($format)*)
    }};
}
