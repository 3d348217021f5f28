use crate::model::RunRequest;
use std::path::Path;
use tokio::process::Command;

/// Command line for one folder run.
///
/// The bag argument carries an unexpanded `*.bag` wildcard. roslaunch hands it
/// to a bash launch-prefix which does the expansion; expanding it here would
/// produce a literal list that prefix does not expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub(crate) fn new(tool: &str, launch: &Path, req: &RunRequest) -> Self {
        let mut args = vec![
            launch.display().to_string(),
            bag_arg(&req.folder),
            format!("autorun:={}", req.autorun),
        ];
        args.extend(req.extra_args.iter().cloned());
        Self {
            program: tool.to_string(),
            args,
        }
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Shell-quoted rendering for logs.
    pub(crate) fn display(&self) -> String {
        let parts = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str));
        shlex::try_join(parts.clone()).unwrap_or_else(|_| parts.collect::<Vec<_>>().join(" "))
    }
}

fn bag_arg(folder: &Path) -> String {
    format!("bag_file:={}/*.bag", folder.display())
}
