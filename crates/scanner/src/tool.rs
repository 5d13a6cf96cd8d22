//! External demuxer adapter
//!
//! The demuxer is driven through an adapter executable with a line-oriented
//! contract, so the demuxer's own output format never has to be parsed here:
//!
//! ```text
//! <tool> titles <dir>                          -> one title number per line
//! <tool> demux-title <dir> <title> <lang,...>  -> one generated filename per line
//! <tool> demux-file <file> <lang,...>          -> one generated filename per line
//! ```
//!
//! Exit status 0 is success, 2 means the input is not the expected structure,
//! 3 a corrupt structure, 4 a bad format conversion; anything else is a
//! generic demuxer failure.

use crate::{MediaScanner, ScanFailure, ScanResult};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Exit status: directory is not a disc / file is not a readable container
pub const EXIT_NOT_RECOGNIZED: i32 = 2;
/// Exit status: recognized structure is corrupt
pub const EXIT_CORRUPT: i32 = 3;
/// Exit status: requested conversion is impossible
pub const EXIT_BAD_CONVERSION: i32 = 4;

/// Scanner that runs an external adapter process for every operation
#[derive(Debug, Clone)]
pub struct ToolScanner {
    program: PathBuf,
    base_args: Vec<String>,
    working_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Titles,
    DemuxTitle,
    DemuxFile,
}

impl Operation {
    fn verb(self) -> &'static str {
        match self {
            Self::Titles => "titles",
            Self::DemuxTitle => "demux-title",
            Self::DemuxFile => "demux-file",
        }
    }
}

impl ToolScanner {
    /// Run `program` with the watched directory as working directory
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    /// Arguments placed before the operation verb (e.g. a script for an interpreter)
    pub fn with_base_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Run one operation to completion and return its stdout
    async fn invoke(&self, op: Operation, target: &Path, extra: &[String]) -> ScanResult<String> {
        // The target may have vanished since the directory was listed
        tokio::fs::metadata(target)
            .await
            .map_err(|source| ScanFailure::Io {
                path: target.to_path_buf(),
                source,
            })?;

        let mut arguments = self.base_args.clone();
        arguments.push(op.verb().to_string());
        arguments.push(target.to_string_lossy().into_owned());
        arguments.extend(extra.iter().cloned());

        debug!(program = %self.program.display(), ?arguments, "invoking demuxer");

        let output = Command::new(&self.program)
            .args(&arguments)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ScanFailure::Io {
                path: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = format!("{}{}", stdout, stderr).trim().to_string();

        Err(match output.status.code() {
            Some(EXIT_NOT_RECOGNIZED) => match op {
                Operation::Titles => ScanFailure::NotADisc { output: diagnostic },
                Operation::DemuxFile => ScanFailure::UnreadableContainer { output: diagnostic },
                Operation::DemuxTitle => ScanFailure::CorruptStructure { output: diagnostic },
            },
            Some(EXIT_CORRUPT) => ScanFailure::CorruptStructure { output: diagnostic },
            Some(EXIT_BAD_CONVERSION) => ScanFailure::BadConversion {
                arguments,
                output: diagnostic,
            },
            status => ScanFailure::Tool {
                arguments,
                status,
                output: diagnostic,
            },
        })
    }
}

#[async_trait]
impl MediaScanner for ToolScanner {
    fn name(&self) -> &'static str {
        "tool"
    }

    async fn list_titles(&self, dir: &Path) -> ScanResult<BTreeSet<u32>> {
        let stdout = self.invoke(Operation::Titles, dir, &[]).await?;

        let mut titles = BTreeSet::new();
        for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let title = line.parse::<u32>().map_err(|_| ScanFailure::Tool {
                arguments: vec![Operation::Titles.verb().to_string()],
                status: Some(0),
                output: format!("unexpected title line: {line:?}"),
            })?;
            titles.insert(title);
        }
        Ok(titles)
    }

    async fn demux_title(
        &self,
        dir: &Path,
        title: u32,
        languages: &[String],
    ) -> ScanResult<BTreeSet<String>> {
        let extra = [title.to_string(), languages.join(",")];
        let stdout = self.invoke(Operation::DemuxTitle, dir, &extra).await?;
        Ok(generated_names(&stdout))
    }

    async fn demux_file(&self, file: &Path, languages: &[String]) -> ScanResult<BTreeSet<String>> {
        let extra = [languages.join(",")];
        let stdout = self.invoke(Operation::DemuxFile, file, &extra).await?;
        Ok(generated_names(&stdout))
    }
}

/// Generated filenames, one per line; any directory part is dropped
fn generated_names(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| Path::new(l).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Adapter script run through `sh`; behaviour is selected by the target name
    const ADAPTER: &str = r#"
op="$1"; target="$(basename "$2")"
case "$op:$target" in
  titles:DISC1) printf '3\n1\n\n2\n' ;;
  titles:plain) echo "no BDMV" >&2; exit 2 ;;
  titles:weird) echo "title one" ;;
  demux-title:DISC1) echo "DISC1_ti$3_tr1_English.dts"; echo "sub/DISC1_ti$3_tr2_English.sup" ;;
  demux-title:*) exit 3 ;;
  demux-file:movie.mkv) echo "movie_tr1_$3.dts" ;;
  demux-file:notes.txt) echo "unsupported container" >&2; exit 2 ;;
  demux-file:convert.mkv) echo "cannot convert" ; exit 4 ;;
  *) echo "generic failure" >&2; exit 9 ;;
esac
"#;

    fn fixture() -> (TempDir, ToolScanner) {
        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("adapter.sh");
        fs::write(&script, ADAPTER).unwrap();
        for dir in ["DISC1", "plain", "weird", "BROKEN"] {
            fs::create_dir(temp_dir.path().join(dir)).unwrap();
        }
        for file in ["movie.mkv", "notes.txt", "convert.mkv", "other.mkv"] {
            fs::write(temp_dir.path().join(file), b"").unwrap();
        }

        let scanner = ToolScanner::new("sh", temp_dir.path())
            .with_base_args([script.to_string_lossy().into_owned()]);
        (temp_dir, scanner)
    }

    #[tokio::test]
    async fn test_list_titles() {
        let (dir, scanner) = fixture();
        let titles = scanner.list_titles(&dir.path().join("DISC1")).await.unwrap();
        assert_eq!(titles.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_not_a_disc() {
        let (dir, scanner) = fixture();
        let err = scanner.list_titles(&dir.path().join("plain")).await.unwrap_err();
        match err {
            ScanFailure::NotADisc { output } => assert_eq!(output, "no BDMV"),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_titles_are_tool_failure() {
        let (dir, scanner) = fixture();
        let err = scanner.list_titles(&dir.path().join("weird")).await.unwrap_err();
        assert!(matches!(err, ScanFailure::Tool { .. }));
    }

    #[tokio::test]
    async fn test_demux_title_strips_directories() {
        let (dir, scanner) = fixture();
        let langs = vec!["English".to_string()];
        let names = scanner
            .demux_title(&dir.path().join("DISC1"), 2, &langs)
            .await
            .unwrap();

        let expected: BTreeSet<String> = ["DISC1_ti2_tr1_English.dts", "DISC1_ti2_tr2_English.sup"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_demux_title_corrupt() {
        let (dir, scanner) = fixture();
        let err = scanner
            .demux_title(&dir.path().join("BROKEN"), 1, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ScanFailure::CorruptStructure { .. }));
    }

    #[tokio::test]
    async fn test_demux_file_outcomes() {
        let (dir, scanner) = fixture();
        let langs = vec!["eng".to_string(), "jpn".to_string()];

        let names = scanner
            .demux_file(&dir.path().join("movie.mkv"), &langs)
            .await
            .unwrap();
        assert!(names.contains("movie_tr1_eng,jpn.dts"));

        let err = scanner
            .demux_file(&dir.path().join("notes.txt"), &langs)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanFailure::UnreadableContainer { .. }));

        let err = scanner
            .demux_file(&dir.path().join("convert.mkv"), &langs)
            .await
            .unwrap_err();
        match err {
            ScanFailure::BadConversion { arguments, output } => {
                assert!(arguments.contains(&"demux-file".to_string()));
                assert_eq!(output, "cannot convert");
            }
            other => panic!("unexpected failure: {other:?}"),
        }

        let err = scanner
            .demux_file(&dir.path().join("other.mkv"), &langs)
            .await
            .unwrap_err();
        match err {
            ScanFailure::Tool { status, output, .. } => {
                assert_eq!(status, Some(9));
                assert_eq!(output, "generic failure");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_target_is_io_failure() {
        let (dir, scanner) = fixture();
        let err = scanner
            .demux_file(&dir.path().join("gone.mkv"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ScanFailure::Io { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_failure() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("movie.mkv"), b"").unwrap();
        let scanner = ToolScanner::new(temp_dir.path().join("no-such-tool"), temp_dir.path());

        let err = scanner
            .demux_file(&temp_dir.path().join("movie.mkv"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ScanFailure::Io { .. }));
    }
}
