use parrot_core::FileDiff;

/// Build a [`FileDiff`] from a provider patch and its reported addition count.
///
/// An absent patch yields no `added_lines`; `addition_count` is kept as given.
///
/// # Examples
///
/// ```
/// use parrot_difflens::patch::file_diff;
///
/// let file = file_diff(Some("@@ -0,0 +1,2 @@\n+a\n+b".into()), 2);
/// assert_eq!(file.added_lines, vec!["a", "b"]);
///
/// let large = file_diff(None, 5000);
/// assert!(large.added_lines.is_empty());
/// assert_eq!(large.addition_count, 5000);
/// ```
pub fn file_diff(patch: Option<String>, addition_count: u64) -> FileDiff {
    let added = patch.as_deref().map(added_lines).unwrap_or_default();
    FileDiff {
        patch,
        added_lines: added,
        addition_count,
    }
}

/// Extract the content of every added line in a unified-diff patch.
///
/// Only lines inside a hunk body count. Hunk bodies are bounded by the line
/// counts in their `@@ -a,b +c,d @@` header, so file headers such as
/// `+++ b/src/app.ts` (which also start with `+`) are never mistaken for
/// content. A patch without any hunk header is treated as a bare body, where
/// `+++ ` lines are still skipped.
///
/// # Examples
///
/// ```
/// use parrot_difflens::patch::added_lines;
///
/// let patch = "\
/// --- a/app.ts
/// +++ b/app.ts
/// @@ -1,2 +1,3 @@
///  const a = 1
/// +const b = 2
///  export { a }";
/// assert_eq!(added_lines(patch), vec!["const b = 2"]);
/// ```
pub fn added_lines(patch: &str) -> Vec<String> {
    if !patch.lines().any(|l| l.starts_with("@@ ")) {
        return patch
            .lines()
            .filter(|l| l.starts_with('+') && !l.starts_with("+++ "))
            .map(|l| l[1..].to_string())
            .collect();
    }

    let mut added = Vec::new();
    let mut body: Option<HunkBody> = None;

    for line in patch.lines() {
        if let Some(hunk) = body.as_mut() {
            if hunk.is_open() && !is_hunk_boundary(line) {
                match line.as_bytes().first() {
                    Some(b'+') => {
                        added.push(line[1..].to_string());
                        hunk.take_new();
                    }
                    Some(b'-') => hunk.take_old(),
                    Some(b'\\') => {}
                    _ => {
                        hunk.take_old();
                        hunk.take_new();
                    }
                }
                continue;
            }
            body = None;
        }

        if line.starts_with("@@ ") {
            body = Some(match parse_hunk_header(line) {
                Some((old_lines, new_lines)) => HunkBody::Counted {
                    old_left: old_lines,
                    new_left: new_lines,
                },
                None => HunkBody::Unbounded,
            });
        }
    }

    added
}

/// Remaining line budget for the hunk currently being read.
enum HunkBody {
    Counted { old_left: u32, new_left: u32 },
    /// Header could not be parsed; read until the next boundary line.
    Unbounded,
}

impl HunkBody {
    fn is_open(&self) -> bool {
        match self {
            HunkBody::Counted { old_left, new_left } => *old_left > 0 || *new_left > 0,
            HunkBody::Unbounded => true,
        }
    }

    fn take_old(&mut self) {
        if let HunkBody::Counted { old_left, .. } = self {
            *old_left = old_left.saturating_sub(1);
        }
    }

    fn take_new(&mut self) {
        if let HunkBody::Counted { new_left, .. } = self {
            *new_left = new_left.saturating_sub(1);
        }
    }
}

fn is_hunk_boundary(line: &str) -> bool {
    line.starts_with("@@ ") || line.starts_with("diff --git ")
}

/// Parse `@@ -a,b +c,d @@` into `(b, d)`. Omitted counts default to 1.
fn parse_hunk_header(line: &str) -> Option<(u32, u32)> {
    let inner = line.strip_prefix("@@ ").and_then(|s| {
        let end = s.find(" @@")?;
        Some(&s[..end])
    })?;

    let (old, new) = inner.split_once(' ')?;
    let old_lines = parse_range_count(old.strip_prefix('-')?)?;
    let new_lines = parse_range_count(new.strip_prefix('+')?)?;
    Some((old_lines, new_lines))
}

fn parse_range_count(range: &str) -> Option<u32> {
    match range.split_once(',') {
        Some((start, count)) => {
            start.parse::<u32>().ok()?;
            count.parse().ok()
        }
        None => {
            range.parse::<u32>().ok()?;
            Some(1)
        }
    }
}
