use argh::FromArgs;
use file_commands::Interpreter;

#[derive(FromArgs)]
/// Drive a single file handle with open, read, write, seek and close commands, one per line.
struct Args {
    #[argh(switch, short = 'i')]
    /// read commands through an interactive line editor instead of standard input.
    interactive: bool,

    #[argh(switch, short = 'v')]
    /// describe the cause of failed commands on standard error.
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let mut interpreter = Interpreter::default();
    interpreter.set_verbose(args.verbose);

    if args.interactive {
        interpreter.repl()
    } else {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout().lock();
        interpreter.run_script(stdin.lock(), &mut stdout)
    }
}
