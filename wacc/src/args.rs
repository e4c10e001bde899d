use crate::{CompileStage, Config};
use std::path::PathBuf;

pub struct Args {
    pub file: PathBuf,
    pub config: Config,
    pub verbose: bool,
}

impl Args {
    pub fn parse() -> Option<Self> {
        let mut args = std::env::args();
        args.next();
        Self::parse_from(args)
    }

    pub fn parse_from(args: impl IntoIterator<Item = String>) -> Option<Self> {
        let mut path: Option<PathBuf> = None;
        let mut stage: Option<CompileStage> = None;
        let mut output: Option<PathBuf> = None;
        let mut verbose = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--lex" => {
                    if !Self::try_update(&mut stage, CompileStage::Lex) {
                        return None;
                    }
                }
                "--parse" => {
                    if !Self::try_update(&mut stage, CompileStage::Parse) {
                        return None;
                    }
                }
                "--validate" => {
                    if !Self::try_update(&mut stage, CompileStage::Validate) {
                        return None;
                    }
                }
                "-o" => {
                    let file = args.next()?;
                    if !Self::try_update(&mut output, file.into()) {
                        return None;
                    }
                }
                "-v" => verbose = true,
                flag if flag.starts_with('-') => return None,
                new_path => {
                    if !Self::try_update(&mut path, new_path.into()) {
                        return None;
                    }
                }
            };
        }
        path.map(|file| Self {
            file,
            config: Config { stage, output },
            verbose,
        })
    }

    fn try_update<T>(option: &mut Option<T>, new: T) -> bool {
        if option.is_none() {
            *option = Some(new);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> Option<Args> {
        Args::parse_from(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn flags() {
        let args = parse(&["--validate", "prog.wacc", "-o", "out.s", "-v"]).unwrap();
        assert_eq!(args.file, PathBuf::from("prog.wacc"));
        assert_eq!(args.config.stage, Some(CompileStage::Validate));
        assert_eq!(args.config.output, Some(PathBuf::from("out.s")));
        assert!(args.verbose);

        let args = parse(&["prog.wacc"]).unwrap();
        assert_eq!(args.config.stage, None);
        assert!(!args.verbose);
    }

    #[test]
    fn rejects_bad_invocations() {
        assert!(parse(&[]).is_none());
        assert!(parse(&["a.wacc", "b.wacc"]).is_none());
        assert!(parse(&["--lex", "--parse", "a.wacc"]).is_none());
        assert!(parse(&["a.wacc", "-o"]).is_none());
        assert!(parse(&["--codegen", "a.wacc"]).is_none());
    }
}
