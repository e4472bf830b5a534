use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;

use crate::Cli;

const BIN_NAME: &str = "chronicle";

fn write_completions<W: Write>(shell: clap_complete::Shell, out: &mut W) {
    clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, out);
}

fn write_man_page<W: Write>(out: &mut W) -> io::Result<()> {
    clap_mangen::Man::new(Cli::command()).render(out)
}

/// Write the main page plus one page per subcommand into `dir`.
fn write_man_pages(dir: &Path) -> io::Result<usize> {
    std::fs::create_dir_all(dir)?;
    clap_mangen::generate_to(Cli::command(), dir)?;
    Ok(std::fs::read_dir(dir)?.count())
}

pub(crate) fn handle_completions(
    shell: clap_complete::Shell,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout().lock();
    write_completions(shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}

pub(crate) fn handle_man(output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(dir) => {
            let pages = write_man_pages(&dir)?;
            println!("Generated {pages} man pages in: {}", dir.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            write_man_page(&mut stdout)?;
            stdout.flush()?;
        }
    }

    Ok(())
}
