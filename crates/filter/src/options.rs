//! Output-shaping flags for the external filter tool.

use std::ffi::OsString;
use std::path::PathBuf;

/// Flat set of jq flags controlling output shape.
///
/// `monochrome` and `force_color` are mutually adjusted based on the
/// destination before a run; [`FilterOptions::to_args`] never emits
/// both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// `-c`: compact instead of pretty-printed output.
    pub compact: bool,
    /// `-n`: use `null` as the single input value.
    pub null_input: bool,
    /// `-s`: read all inputs into an array and filter that.
    pub slurp: bool,
    /// `-r`: output raw strings, not JSON texts.
    pub raw_output: bool,
    /// `-R`: read raw strings, not JSON texts.
    pub raw_input: bool,
    /// `-M`: disable colorized output.
    pub monochrome: bool,
    /// `-S`: sort object keys on output.
    pub sort_keys: bool,
    /// `-C`: force colorized output.
    pub force_color: bool,
    /// `-L <dir>`: module search paths, one flag/value pair each.
    pub library_paths: Vec<PathBuf>,
}

impl FilterOptions {
    /// Serialize into the external tool's flag syntax.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if self.compact {
            args.push("-c".into());
        }
        if self.null_input {
            args.push("-n".into());
        }
        if self.slurp {
            args.push("-s".into());
        }
        if self.raw_output {
            args.push("-r".into());
        }
        if self.raw_input {
            args.push("-R".into());
        }
        if self.monochrome {
            args.push("-M".into());
        } else if self.force_color {
            args.push("-C".into());
        }
        if self.sort_keys {
            args.push("-S".into());
        }
        for dir in &self.library_paths {
            args.push("-L".into());
            args.push(dir.clone().into_os_string());
        }
        args
    }

    /// Overrides for an interactive display pane: the pane always wants
    /// pretty, colorized, structured rendering, whatever the user asked
    /// for on the final output.
    pub fn for_interactive(&self) -> Self {
        let mut options = self.clone();
        options.force_color = true;
        options.monochrome = false;
        options.compact = false;
        options.raw_output = false;
        options
    }

    /// Overrides for the subsidiary autocomplete invocation: plain,
    /// compact, machine-readable JSON.
    pub fn for_completion(&self) -> Self {
        let mut options = self.clone();
        options.monochrome = true;
        options.force_color = false;
        options.compact = true;
        options.raw_output = false;
        options
    }

    /// Resolve color flags for the final non-interactive write: a
    /// terminal gets color unless `-M` was requested, a pipe gets
    /// monochrome unless `-C` was requested.
    pub fn for_final_output(&self, is_terminal: bool) -> Self {
        let mut options = self.clone();
        if is_terminal {
            if !options.monochrome {
                options.force_color = true;
            }
        } else if !options.force_color {
            options.monochrome = true;
        }
        options
    }
}
