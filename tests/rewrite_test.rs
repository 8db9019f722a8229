use anyhow::Result;
use git2::{Oid, Repository, Signature};
use recommit::data::Reword;
use recommit::git::{
    CommitterIdentity, DiffSource, GitRepository, LocalDiffSource, RewriteBackend, RewriteHandler,
    RewriteOptions, RewriteOutcome,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test setup that creates a temporary git repository with test commits
struct TestRepo {
    _temp_dir: TempDir,
    repo_path: PathBuf,
    repo: Repository,
    commits: Vec<Oid>,
}

impl TestRepo {
    fn new() -> Result<Self> {
        // Create temporary directory
        let temp_dir = tempfile::tempdir()?;
        let repo_path = temp_dir.path().to_path_buf();

        // Initialize git repository
        let repo = Repository::init(&repo_path)?;

        // Configure git user for commits
        let mut config = repo.config()?;
        config.set_str("user.name", "Test User")?;
        config.set_str("user.email", "test@example.com")?;

        Ok(TestRepo {
            _temp_dir: temp_dir,
            repo_path,
            repo,
            commits: Vec::new(),
        })
    }

    fn add_commit(&mut self, message: &str, content: &str) -> Result<Oid> {
        // Create a test file
        let file_path = self.repo_path.join("test.txt");
        fs::write(&file_path, content)?;

        // Add file to index
        let mut index = self.repo.index()?;
        index.add_path(std::path::Path::new("test.txt"))?;
        index.write()?;

        // Create commit
        let signature = Signature::now("Test User", "test@example.com")?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent_commit = if let Some(last_commit_id) = self.commits.last() {
            Some(self.repo.find_commit(*last_commit_id)?)
        } else {
            None
        };

        let parents: Vec<&git2::Commit> = parent_commit.iter().collect();

        let commit_id = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;

        self.commits.push(commit_id);
        Ok(commit_id)
    }

    fn hash(&self, index: usize) -> String {
        self.commits[index].to_string()
    }

    fn message_of_head_ancestor(&self, generations: usize) -> Result<String> {
        let mut commit = self.repo.head()?.peel_to_commit()?;
        for _ in 0..generations {
            commit = commit.parent(0)?;
        }
        Ok(commit.message().unwrap_or("").to_string())
    }

    fn reword(&self, index: usize, original: &str, message: &str) -> Reword {
        Reword {
            commit: self.hash(index),
            original: original.to_string(),
            message: message.to_string(),
        }
    }
}

fn local_options() -> RewriteOptions {
    RewriteOptions {
        backend: RewriteBackend::Direct,
        committer: None,
        push_remote: None,
    }
}

#[tokio::test]
async fn diff_fetch_returns_patch_text_in_order() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("Initial commit", "Hello, world!\n")?;
    test_repo.add_commit("Add feature", "Hello, world!\nNew feature added.\n")?;

    let source = LocalDiffSource::open_at(&test_repo.repo_path)?;
    let ids = vec![test_repo.hash(0), test_repo.hash(1)];
    let diffs = source.fetch_all(&ids).await?;

    assert_eq!(diffs.len(), 2);
    assert_eq!(diffs[0].id, ids[0]);
    assert_eq!(diffs[1].id, ids[1]);

    // Root commit diffs against the empty tree
    assert!(diffs[0].diff.contains("+Hello, world!"));
    // Second commit shows only its own change
    assert!(diffs[1].diff.contains("+New feature added."));
    assert!(!diffs[1].diff.contains("+Hello, world!\n+"));

    Ok(())
}

#[tokio::test]
async fn diff_fetch_fails_atomically_on_unknown_commit() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("Initial commit", "Hello, world!\n")?;

    let source = LocalDiffSource::open_at(&test_repo.repo_path)?;
    let ids = vec![test_repo.hash(0), "f".repeat(40)];

    assert!(source.fetch_all(&ids).await.is_err());

    Ok(())
}

#[test]
fn commits_in_range_is_oldest_first() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("Initial commit", "a\n")?;
    test_repo.add_commit("Add feature", "a\nb\n")?;
    test_repo.add_commit("Fix bug", "a\nb\nc\n")?;

    let repo = GitRepository::open_at(&test_repo.repo_path)?;
    let range = format!("{}..{}", test_repo.hash(0), test_repo.hash(2));
    let commits = repo.commits_in_range(&range)?;

    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].id, test_repo.hash(1));
    assert_eq!(commits[0].original_message, "Add feature");
    assert_eq!(commits[1].id, test_repo.hash(2));

    let head_only = repo.commits_in_range("HEAD")?;
    assert_eq!(head_only.len(), 1);
    assert_eq!(head_only[0].id, test_repo.hash(2));

    Ok(())
}

#[test]
fn noop_plan_touches_nothing() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("Initial commit", "a\n")?;
    test_repo.add_commit("Fix bug", "a\nb\n")?;
    let head_before = test_repo.repo.head()?.target();

    let plan = vec![
        test_repo.reword(0, "Initial commit", "Initial commit"),
        test_repo.reword(1, "Fix bug", "Fix bug"),
    ];

    let handler = RewriteHandler::open_at(&test_repo.repo_path)?;
    let outcome = handler.apply(&plan, &local_options())?;

    assert!(matches!(outcome, RewriteOutcome::Unchanged));
    assert_eq!(test_repo.repo.head()?.target(), head_before);

    // Zero filesystem writes: no rewrite-state files appear
    assert!(!test_repo.repo_path.join("commit-0.txt").exists());
    assert!(!test_repo.repo_path.join("count.txt").exists());
    assert!(!test_repo.repo_path.join("reword.sh").exists());

    Ok(())
}

#[test]
fn direct_rewrite_replaces_messages_in_order() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("Initial commit", "a\n")?;
    test_repo.add_commit("Add feature", "a\nb\n")?;
    test_repo.add_commit("Fix bug", "a\nb\nc\n")?;

    let head_tree_before = test_repo.repo.head()?.peel_to_commit()?.tree_id();

    // Rewrite the two newest commits; the root stays untouched
    let plan = vec![
        test_repo.reword(1, "Add feature", "feat: add retry"),
        test_repo.reword(2, "Fix bug", "fix: resolve null pointer"),
    ];

    let handler = RewriteHandler::open_at(&test_repo.repo_path)?;
    let outcome = handler.apply(&plan, &local_options())?;
    assert!(matches!(outcome, RewriteOutcome::Rewritten { .. }));

    let head = test_repo.repo.head()?.peel_to_commit()?;
    assert_eq!(head.message().unwrap_or("").trim_end(), "fix: resolve null pointer");
    assert_eq!(
        test_repo.message_of_head_ancestor(1)?.trim_end(),
        "feat: add retry"
    );

    // The anchor's parent is the untouched root commit
    let root = head.parent(0)?.parent(0)?;
    assert_eq!(root.id(), test_repo.commits[0]);
    assert_eq!(root.message().unwrap_or(""), "Initial commit");

    // Trees and authors are preserved; only messages changed
    assert_eq!(head.tree_id(), head_tree_before);
    assert_eq!(head.author().name(), Some("Test User"));

    Ok(())
}

#[test]
fn direct_rewrite_handles_root_anchor() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("wip", "a\n")?;
    test_repo.add_commit("more wip", "a\nb\n")?;

    let plan = vec![
        test_repo.reword(0, "wip", "feat: initial layout"),
        test_repo.reword(1, "more wip", "feat: extend layout"),
    ];

    let handler = RewriteHandler::open_at(&test_repo.repo_path)?;
    handler.apply(&plan, &local_options())?;

    let head = test_repo.repo.head()?.peel_to_commit()?;
    assert_eq!(head.message().unwrap_or("").trim_end(), "feat: extend layout");

    let root = head.parent(0)?;
    assert_eq!(root.message().unwrap_or("").trim_end(), "feat: initial layout");
    assert_eq!(root.parent_count(), 0);

    Ok(())
}

#[test]
fn plan_not_reaching_head_is_rejected() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("Initial commit", "a\n")?;
    test_repo.add_commit("Add feature", "a\nb\n")?;
    test_repo.add_commit("Fix bug", "a\nb\nc\n")?;

    // Covers only the middle commit, not up to HEAD
    let plan = vec![test_repo.reword(1, "Add feature", "feat: add retry")];

    let handler = RewriteHandler::open_at(&test_repo.repo_path)?;
    assert!(handler.apply(&plan, &local_options()).is_err());

    Ok(())
}

#[test]
fn out_of_order_plan_is_rejected() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("Initial commit", "a\n")?;
    test_repo.add_commit("Add feature", "a\nb\n")?;
    test_repo.add_commit("Fix bug", "a\nb\nc\n")?;

    let plan = vec![
        test_repo.reword(2, "Fix bug", "fix: resolve null pointer"),
        test_repo.reword(1, "Add feature", "feat: add retry"),
    ];

    let handler = RewriteHandler::open_at(&test_repo.repo_path)?;
    assert!(handler.apply(&plan, &local_options()).is_err());

    Ok(())
}

#[test]
fn script_rewrite_applies_messages_and_cleans_up() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("Initial commit", "a\n")?;
    test_repo.add_commit("Add feature", "a\nb\n")?;
    test_repo.add_commit("Fix bug", "a\nb\nc\n")?;

    let head_tree_before = test_repo.repo.head()?.peel_to_commit()?.tree_id();

    let plan = vec![
        test_repo.reword(1, "Add feature", "feat: add retry"),
        test_repo.reword(2, "Fix bug", "fix: resolve null pointer"),
    ];

    let opts = RewriteOptions {
        backend: RewriteBackend::SequenceScript,
        committer: Some(CommitterIdentity {
            name: "octocat".to_string(),
            email: "octocat@users.noreply.github.com".to_string(),
        }),
        push_remote: None,
    };

    let handler = RewriteHandler::open_at(&test_repo.repo_path)?;
    let outcome = handler.apply(&plan, &opts)?;
    assert!(matches!(outcome, RewriteOutcome::Rewritten { .. }));

    // Reopen: the rebase ran in a subprocess
    let repo = Repository::open(&test_repo.repo_path)?;
    let head = repo.head()?.peel_to_commit()?;
    assert_eq!(head.message().unwrap_or("").trim_end(), "fix: resolve null pointer");
    assert_eq!(
        head.parent(0)?.message().unwrap_or("").trim_end(),
        "feat: add retry"
    );

    // Committer identity comes from the rewrite, author is preserved
    assert_eq!(head.committer().name(), Some("octocat"));
    assert_eq!(
        head.committer().email(),
        Some("octocat@users.noreply.github.com")
    );
    assert_eq!(head.author().name(), Some("Test User"));

    // Content is untouched
    assert_eq!(head.tree_id(), head_tree_before);

    // All temporary artifacts are gone after success
    assert!(!test_repo.repo_path.join("commit-0.txt").exists());
    assert!(!test_repo.repo_path.join("commit-1.txt").exists());
    assert!(!test_repo.repo_path.join("count.txt").exists());
    assert!(!test_repo.repo_path.join("reword.sh").exists());

    // The repository is back in a clean state
    assert_eq!(repo.state(), git2::RepositoryState::Clean);

    Ok(())
}
