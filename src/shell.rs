//! The interactive command loop.
//!
//! The shell reads one line per command from an injected reader and writes
//! everything it has to say to an injected writer, so a whole session can be
//! driven from a pair of in-memory buffers in tests. Commands:
//!
//! ```text
//! cd <name>            change directory, ".." goes to the parent
//! ls                   list names
//! ls -s                list names with file sizes
//! mkdir <name>         create a subdirectory
//! rm <name>            remove a subdirectory
//! rmf <name>           remove a file, reclaiming its blocks
//! touch <name>         create an empty file
//! touch <name> <data>  append one token of data to a file
//! cat <name>           print file contents
//! exit()               end the session
//! ```
//!
//! Anything else, including a known command with the wrong argument count,
//! prints `Invalid command` and changes nothing. After every command that can
//! mutate state the whole image is checkpointed; a failed checkpoint is
//! reported and the session carries on.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use log::warn;

use crate::error::Result;
use crate::fs::{Entry, FileSystem};
use crate::image;

pub struct Shell<R, W> {
    fs: FileSystem,
    image_path: PathBuf,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(fs: FileSystem, image_path: PathBuf, input: R, output: W) -> Self {
        Shell {
            fs,
            image_path,
            input,
            output,
        }
    }

    pub fn fs(&self) -> &FileSystem {
        &self.fs
    }

    pub fn into_fs(self) -> FileSystem {
        self.fs
    }

    /// Runs the loop until `exit()` or end of input.
    pub fn run(&mut self) -> std::io::Result<()> {
        let image_name = self
            .image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        loop {
            write!(self.output, "{}:{}> ", image_name, self.fs.cwd_path())?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                // End of input ends the session like exit().
                return Ok(());
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "exit()" {
                return Ok(());
            }
            self.dispatch(line)?;
        }
    }

    fn dispatch(&mut self, line: &str) -> std::io::Result<()> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let mutated = match parts.as_slice() {
            ["cd", name] => {
                let outcome = self.fs.change_dir(name);
                self.report(outcome)?;
                true
            }
            ["ls"] => {
                for entry in self.fs.list_dir() {
                    match entry {
                        Entry::Dir(name) => writeln!(self.output, "[DIR] {}", name)?,
                        Entry::File(name, _) => writeln!(self.output, "[FILE] {}", name)?,
                    }
                }
                false
            }
            ["ls", "-s"] => {
                for entry in self.fs.list_dir() {
                    match entry {
                        Entry::Dir(name) => writeln!(self.output, "[DIR] {}", name)?,
                        Entry::File(name, size) => {
                            writeln!(self.output, "[FILE] {} ({} bytes)", name, size)?
                        }
                    }
                }
                false
            }
            ["mkdir", name] => {
                let outcome = self.fs.make_dir(name);
                self.report(outcome)?;
                true
            }
            ["rm", name] => {
                let outcome = self.fs.remove_dir(name);
                if outcome.is_ok() {
                    writeln!(self.output, "Directory removed: {}", name)?;
                }
                self.report(outcome)?;
                true
            }
            ["rmf", name] => {
                let outcome = self.fs.remove_file(name);
                self.report(outcome)?;
                true
            }
            ["touch", name] => {
                let outcome = self.fs.create_file(name);
                if outcome.is_ok() {
                    writeln!(self.output, "File created: {}", name)?;
                }
                self.report(outcome)?;
                true
            }
            ["touch", name, data] => {
                match self.fs.write_file(name, data.as_bytes()) {
                    Ok(_) => writeln!(self.output, "Data written to file: {}", name)?,
                    Err(e) => writeln!(self.output, "{}", e)?,
                }
                true
            }
            ["cat", name] => {
                match self.fs.read_file(name) {
                    Ok(text) => writeln!(self.output, "{}", text)?,
                    Err(e) => writeln!(self.output, "{}", e)?,
                }
                false
            }
            _ => {
                writeln!(self.output, "Invalid command")?;
                false
            }
        };
        if mutated {
            // A failed write may still have allocated blocks, so checkpoint
            // even after errors to keep the image in step with memory.
            if let Err(e) = image::save(&self.image_path, &self.fs) {
                warn!("checkpoint of {} failed: {}", self.image_path.display(), e);
                writeln!(self.output, "warning: could not save image: {}", e)?;
            }
        }
        Ok(())
    }

    fn report<T>(&mut self, outcome: Result<T>) -> std::io::Result<()> {
        if let Err(e) = outcome {
            writeln!(self.output, "{}", e)?;
        }
        Ok(())
    }
}
