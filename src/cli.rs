use crate::models::CommentSort;
use crate::tree::LocationHint;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "redtree",
    version,
    about = "Browse Reddit comment trees, loading hidden replies on demand."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where to start looking for a comment
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum Hint {
    /// Close to the top of the thread (breadth-first search)
    Top,
    /// Deep in the thread (post-order search)
    Bottom,
    /// Unknown (pre-order search)
    #[default]
    Anywhere,
}

impl From<Hint> for LocationHint {
    fn from(hint: Hint) -> Self {
        match hint {
            Hint::Top => LocationHint::NearTop,
            Hint::Bottom => LocationHint::NearBottom,
            Hint::Anywhere => LocationHint::Anywhere,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Print the comment tree of a submission.
    Comments {
        /// The submission to read, as an id or a fullname (ex: 92dd8 or t3_92dd8).
        #[arg(help = "Submission id or fullname", required = true)]
        submission: String,

        /// Comment sort order. Falls back to REDDIT_COMMENT_SORT, then "confidence".
        #[arg(
            long,
            short,
            help = "Sort order (confidence, top, new, hot, controversial, old, qa, random)"
        )]
        sort: Option<CommentSort>,

        /// Only show this comment and its replies.
        #[arg(long, short, help = "Comment id to focus on (optional)")]
        focus: Option<String>,

        /// Expand every "load more comments" placeholder before printing.
        #[arg(long, short, help = "Load every hidden comment")]
        all: bool,

        #[arg(long, help = "Do not load hidden comments below this depth")]
        depth_limit: Option<usize>,

        #[arg(long, help = "Maximum number of morechildren requests")]
        request_limit: Option<usize>,
    },

    /// Look up a comment in a submission's tree and print its subtree.
    Find {
        #[arg(help = "Submission id or fullname", required = true)]
        submission: String,

        #[arg(help = "Comment id or fullname", required = true)]
        comment: String,

        #[arg(long, value_enum, default_value_t = Hint::Anywhere, help = "Where the comment probably is")]
        hint: Hint,

        #[arg(long, short, help = "Sort order")]
        sort: Option<CommentSort>,

        /// Keep loading hidden comments until the comment is found.
        #[arg(long, short, help = "Load hidden comments while searching")]
        all: bool,

        #[arg(long, help = "Maximum number of morechildren requests")]
        request_limit: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_command() {
        let cli = Cli::try_parse_from([
            "redtree", "comments", "92dd8", "--sort", "top", "--all", "--request-limit", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Comments {
                submission,
                sort,
                all,
                request_limit,
                depth_limit,
                focus,
            } => {
                assert_eq!(submission, "92dd8");
                assert_eq!(sort, Some(CommentSort::Top));
                assert!(all);
                assert_eq!(request_limit, Some(3));
                assert_eq!(depth_limit, None);
                assert_eq!(focus, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_find_command() {
        let cli =
            Cli::try_parse_from(["redtree", "find", "t3_x", "abc", "--hint", "bottom"]).unwrap();
        match cli.command {
            Commands::Find { comment, hint, .. } => {
                assert_eq!(comment, "abc");
                assert_eq!(LocationHint::from(hint), LocationHint::NearBottom);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_sort() {
        assert!(Cli::try_parse_from(["redtree", "comments", "x", "--sort", "sideways"]).is_err());
    }
}
