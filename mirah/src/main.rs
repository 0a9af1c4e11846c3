use std::process::ExitCode;

use miette::MietteHandlerOpts;

fn main() -> ExitCode {
    setup_miette_handler();
    mirah::cli::run(std::env::args_os())
}

/// Configure miette for error reporting
fn setup_miette_handler() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .tab_width(4)
                .with_cause_chain()
                .build(),
        )
    }))
    .ok();
}
