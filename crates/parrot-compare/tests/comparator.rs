use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parrot_compare::cohort::challenge_names;
use parrot_compare::{Comparator, OverlapScorer};
use parrot_core::{CohortConfig, CompareConfig, MatchMode, ParrotError, RepoCoordinates};
use parrot_github::fetch::{DiffFetcher, RetryPolicy};
use parrot_github::provider::{
    AccountRef, ChangedFile, CommitDetail, CommitSummary, Comparison, FileStatus, GitProvider,
    GitSignature, OrgRepo, ProviderError,
};

/// In-memory organization: repositories, their branches and diffs.
#[derive(Default)]
struct FakeOrg {
    repos: Vec<OrgRepo>,
    branches: HashMap<String, Vec<String>>,
    diffs: HashMap<(String, String), Comparison>,
    directories: HashMap<String, Vec<String>>,
    throttled: Mutex<HashMap<String, u32>>,
}

impl FakeOrg {
    fn repo(mut self, name: &str, pushed_at: DateTime<Utc>, branches: &[&str]) -> Self {
        self.repos.push(OrgRepo {
            name: name.into(),
            created_at: None,
            updated_at: None,
            pushed_at: Some(pushed_at),
        });
        self.branches
            .insert(name.into(), branches.iter().map(|b| b.to_string()).collect());
        self
    }

    fn diff(mut self, repo: &str, branch: &str, author: &str, files: &[(&str, &[&str])]) -> Self {
        let files = files
            .iter()
            .map(|(name, lines)| {
                let body: String = lines.iter().map(|l| format!("\n+{l}")).collect();
                ChangedFile {
                    filename: name.to_string(),
                    status: FileStatus::Added,
                    previous_filename: None,
                    patch: Some(format!("@@ -0,0 +1,{} @@{body}", lines.len())),
                    additions: lines.len() as u64,
                }
            })
            .collect();
        let commits = vec![CommitSummary {
            author: Some(AccountRef {
                login: author.into(),
            }),
            commit: CommitDetail {
                author: Some(GitSignature {
                    name: Some(author.into()),
                    date: None,
                }),
            },
        }];
        self.diffs
            .insert((repo.into(), branch.into()), Comparison { files, commits });
        self
    }

    fn throttle(self, branch: &str, times: u32) -> Self {
        self.throttled
            .lock()
            .unwrap()
            .insert(branch.to_string(), times);
        self
    }
}

impl GitProvider for FakeOrg {
    async fn compare(
        &self,
        coords: &RepoCoordinates,
        _base: &str,
        head: &str,
    ) -> Result<Comparison, ProviderError> {
        {
            let mut throttled = self.throttled.lock().unwrap();
            if let Some(left) = throttled.get_mut(head) {
                if *left > 0 {
                    *left -= 1;
                    return Err(ProviderError::RateLimited {
                        retry_after: Duration::from_secs(1),
                    });
                }
            }
        }
        self.diffs
            .get(&(coords.repo.clone(), head.to_string()))
            .cloned()
            .ok_or(ProviderError::NotFound)
    }

    async fn list_branches(&self, coords: &RepoCoordinates) -> Result<Vec<String>, ProviderError> {
        self.branches
            .get(&coords.repo)
            .cloned()
            .ok_or(ProviderError::NotFound)
    }

    async fn list_org_repos(&self, _org: &str) -> Result<Vec<OrgRepo>, ProviderError> {
        Ok(self.repos.clone())
    }

    async fn list_directory(
        &self,
        _coords: &RepoCoordinates,
        path: &str,
    ) -> Result<Vec<String>, ProviderError> {
        self.directories
            .get(path)
            .cloned()
            .ok_or(ProviderError::NotFound)
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap()
}

fn comparator(org: FakeOrg) -> Comparator<FakeOrg> {
    let fetcher = DiffFetcher::new(org, &CompareConfig::default(), RetryPolicy::default());
    Comparator::new(fetcher, OverlapScorer::new(MatchMode::Membership, false))
}

fn todo_org() -> FakeOrg {
    FakeOrg::default()
        .repo("todo", now(), &["main", "alice", "bob", "carol", "dave"])
        .diff("todo", "alice", "alice", &[("file.ts", &["a", "b", "c"])])
        .diff("todo", "bob", "bob", &[("file.ts", &["b", "c", "d"])])
        .diff("todo", "carol", "carol", &[("other.ts", &["x"])])
        .diff("todo", "dave", "dave", &[("file.ts", &["a", "b", "c"])])
}

fn coords() -> RepoCoordinates {
    RepoCoordinates::new("cohort", "todo")
}

#[tokio::test]
async fn all_pairs_counts_each_pair_once() {
    let ranked = comparator(todo_org()).compare_all(&coords()).await.unwrap();
    assert_eq!(ranked.len(), 6);

    let mut pairs: Vec<(String, String)> = ranked
        .iter()
        .map(|c| {
            let mut pair = [c.base.name.clone(), c.comparison.name.clone()];
            pair.sort();
            (pair[0].clone(), pair[1].clone())
        })
        .collect();
    pairs.sort();
    pairs.dedup();
    assert_eq!(pairs.len(), 6);

    assert!(ranked
        .iter()
        .all(|c| c.base.name != c.comparison.name && c.base.name != "main" && c.comparison.name != "main"));

    let top = ranked.most_similar().unwrap();
    assert_eq!(top.ratio, 1.0);
    assert_eq!(
        (top.base.name.as_str(), top.comparison.name.as_str()),
        ("alice", "dave")
    );
}

#[tokio::test]
async fn all_pairs_scores_shared_lines() {
    let ranked = comparator(todo_org()).compare_all(&coords()).await.unwrap();
    let alice_bob = ranked
        .iter()
        .find(|c| c.base.name == "alice" && c.comparison.name == "bob")
        .unwrap();
    assert_eq!(alice_bob.total_overlap, 2);
    assert_eq!(alice_bob.total_additions, 3);
    assert!((alice_bob.ratio - 0.667).abs() < 0.001);
    assert!(!alice_bob.is_solo);
}

#[tokio::test]
async fn diverged_branch_is_dropped() {
    let org = todo_org().repo("todo", now(), &["main", "alice", "bob", "carol", "dave", "orphan"]);
    let ranked = comparator(org).compare_all(&coords()).await.unwrap();
    assert_eq!(ranked.len(), 6);
    assert!(ranked.iter().all(|c| c.comparison.name != "orphan"));
}

#[tokio::test]
async fn one_vs_many_excludes_self_and_baseline() {
    let ranked = comparator(todo_org())
        .compare_one(&coords(), "alice")
        .await
        .unwrap();
    assert_eq!(ranked.len(), 3);
    assert!(ranked.iter().all(|c| c.base.name == "alice"));
    assert!(ranked
        .iter()
        .all(|c| c.comparison.name != "alice" && c.comparison.name != "main"));
    assert_eq!(ranked.most_similar().unwrap().comparison.name, "dave");
}

#[tokio::test]
async fn one_vs_many_without_base_diff_fails() {
    let err = comparator(todo_org())
        .compare_one(&coords(), "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, ParrotError::MissingDiff(ref b) if b == "ghost"));
}

#[tokio::test]
async fn one_vs_many_for_baseline_fails() {
    let err = comparator(todo_org())
        .compare_one(&coords(), "main")
        .await
        .unwrap_err();
    assert!(matches!(err, ParrotError::MissingDiff(_)));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_branch_recovers() {
    let ranked = comparator(todo_org().throttle("bob", 1))
        .compare_one(&coords(), "alice")
        .await
        .unwrap();
    let bob = ranked
        .iter()
        .find(|c| c.comparison.name == "bob")
        .unwrap();
    assert_eq!(bob.total_overlap, 2);
}

#[tokio::test(start_paused = true)]
async fn persistent_rate_limit_aborts_run() {
    let err = comparator(todo_org().throttle("carol", 100))
        .compare_all(&coords())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ParrotError::RateLimitExceeded { ref branch, attempts: 5 } if branch == "carol"
    ));
}

#[tokio::test]
async fn student_sweep_matches_branch_substring() {
    let org = todo_org()
        .repo("weather", now(), &["main", "bob-weather", "carol-weather"])
        .diff("weather", "bob-weather", "bob", &[("w.ts", &["sun"])])
        .diff("weather", "carol-weather", "carol", &[("w.ts", &["sun"])])
        .repo("ignored", now(), &["main", "alice"])
        .diff("ignored", "alice", "alice", &[("i.ts", &["z"])])
        .repo("kata", now(), &["main", "Alice-Kata", "bob"])
        .diff("kata", "Alice-Kata", "alice", &[("k.ts", &["k"])])
        .diff("kata", "bob", "bob", &[("k.ts", &["k"])]);

    let allow = vec!["todo".to_string(), "weather".to_string(), "kata".to_string()];
    let results = comparator(org)
        .compare_one_all_repos("cohort", "ALICE", &allow)
        .await
        .unwrap();

    let repos: Vec<&str> = results.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(repos, vec!["todo", "kata"]);

    assert_eq!(results[0].comparisons.len(), 3);
    assert!(results[0]
        .comparisons
        .iter()
        .all(|c| c.base.name == "alice"));

    let kata = &results[1].comparisons;
    assert_eq!(kata.len(), 1);
    assert_eq!(kata.most_similar().unwrap().ratio, 1.0);
}

#[tokio::test]
async fn student_sweep_fails_when_student_branch_has_no_diff() {
    let org = FakeOrg::default()
        .repo("todo", now(), &["main", "alice", "bob"])
        .diff("todo", "bob", "bob", &[("file.ts", &["b"])]);

    let allow = vec!["todo".to_string()];
    let err = comparator(org)
        .compare_one_all_repos("cohort", "alice", &allow)
        .await
        .unwrap_err();
    assert!(matches!(err, ParrotError::MissingDiff(ref b) if b == "alice"));
}

#[tokio::test]
async fn cohort_sweep_skips_quiet_repos() {
    let stale = now() - chrono::Duration::hours(48);
    let org = todo_org()
        .repo("weather", stale, &["main", "bob", "carol"])
        .diff("weather", "bob", "bob", &[("w.ts", &["sun"])])
        .diff("weather", "carol", "carol", &[("w.ts", &["sun"])]);

    let allow = vec!["todo".to_string(), "weather".to_string()];
    let report = comparator(org)
        .compare_cohort("cohort", &allow, now(), 24)
        .await
        .unwrap();

    assert_eq!(report.repos.len(), 1);
    assert_eq!(report.repos[0].repo, "todo");
    assert_eq!(report.total_comparisons(), 6);

    let alarms = report.alarms(0.9);
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0].0, "todo");
    assert_eq!(alarms[0].1.ratio, 1.0);
}

#[tokio::test]
async fn challenge_names_drop_solutions() {
    let mut org = FakeOrg::default();
    org.directories.insert(
        "packages".into(),
        vec!["todo".into(), "todo-solution".into(), "weather".into()],
    );
    let names = challenge_names(&org, &CohortConfig::default()).await.unwrap();
    assert_eq!(names, vec!["todo", "weather"]);
}

#[tokio::test]
async fn challenge_names_prefer_configured_list() {
    let config = CohortConfig {
        active_repos: vec!["kata".into()],
        ..CohortConfig::default()
    };
    let names = challenge_names(&FakeOrg::default(), &config).await.unwrap();
    assert_eq!(names, vec!["kata"]);
}

#[tokio::test]
async fn challenge_names_reject_bad_repo() {
    let config = CohortConfig {
        challenges_repo: "no-slash".into(),
        ..CohortConfig::default()
    };
    let err = challenge_names(&FakeOrg::default(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ParrotError::Config(_)));
}
