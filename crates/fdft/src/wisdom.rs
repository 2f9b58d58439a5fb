//! Wisdom: the planner's memo of solved and unsolvable problems.
//!
//! Entries map `(ProblemHash, SolverId)` to a verdict plus the planner
//! flags it was reached under. Wisdom is advisory: a stale or corrupt entry
//! only costs a cache miss.
//!
//! # Text format
//!
//! ```text
//! (fdft-wisdom 1
//!   (ct-dit/t1_4 0 good #x31 0f3a...e1 #9c1d2e3f4a5b6c7d)
//! )
//! ```
//!
//! Each entry line carries its solver name, registration id, verdict,
//! flags, problem hash and a 64-bit blake3 checksum of those fields, so
//! lines are validated one at a time on import.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FftError;
use crate::flags::PlannerFlags;
use crate::problem::ProblemHash;
use crate::solver::{Registry, SolverId};

pub const WISDOM_VERSION: u32 = 1;
const HEADER_PREFIX: &str = "(fdft-wisdom ";

/// Outcome of a wisdom lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Good,
    Bad,
    Unknown,
}

impl Verdict {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WisdomEntry {
    pub verdict: Verdict,
    pub flags: PlannerFlags,
}

/// What [`Wisdom::forget`] drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amnesia {
    Everything,
    /// Only `Bad` entries; solved problems stay.
    Bad,
}

/// A line dropped during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardedEntry {
    /// 1-based line number in the imported text.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub accepted: usize,
    pub discarded: Vec<DiscardedEntry>,
    /// Set when the text as a whole is damaged (bad header, missing
    /// trailer). Entries may still have been accepted.
    pub corrupt: Option<FftError>,
}

impl ImportReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.discarded.is_empty() && self.corrupt.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wisdom {
    entries: BTreeMap<ProblemHash, BTreeMap<SolverId, WisdomEntry>>,
}

impl Wisdom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in canonical (hash, solver name, reg id) order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProblemHash, &SolverId, &WisdomEntry)> {
        self.entries
            .iter()
            .flat_map(|(hash, per)| per.iter().map(move |(id, entry)| (hash, id, entry)))
    }

    #[must_use]
    pub fn entry(&self, hash: &ProblemHash, id: &SolverId) -> Option<&WisdomEntry> {
        self.entries.get(hash).and_then(|per| per.get(id))
    }

    #[must_use]
    pub fn lookup(&self, hash: &ProblemHash, id: &SolverId) -> Verdict {
        self.entry(hash, id).map_or(Verdict::Unknown, |e| e.verdict)
    }

    /// Record a verdict. `Unknown` removes the entry. A `Good` verdict
    /// replaces any other `Good` entry for the hash recorded under the
    /// same flags, so each (problem, flags) pair has one winner.
    pub fn store(&mut self, hash: ProblemHash, id: SolverId, verdict: Verdict, flags: PlannerFlags) {
        let flags = flags.wisdom_bits();
        if verdict == Verdict::Unknown {
            if let Some(per) = self.entries.get_mut(&hash) {
                per.remove(&id);
                if per.is_empty() {
                    self.entries.remove(&hash);
                }
            }
            return;
        }
        let per = self.entries.entry(hash).or_default();
        if verdict == Verdict::Good {
            per.retain(|other, e| other == &id || e.verdict != Verdict::Good || e.flags != flags);
        }
        per.insert(id, WisdomEntry { verdict, flags });
    }

    /// The `Good` entry best suited to answer `request`: exact flags
    /// first, then the most patient, then the first in canonical order.
    #[must_use]
    pub fn winner(&self, hash: &ProblemHash, request: PlannerFlags) -> Option<(SolverId, PlannerFlags)> {
        let wanted = request.wisdom_bits();
        let mut best: Option<(&SolverId, &WisdomEntry)> = None;
        for (id, entry) in self.entries.get(hash)? {
            if entry.verdict != Verdict::Good || !entry.flags.answers(request) {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, current)) => {
                    let rank = |e: &WisdomEntry| (e.flags == wanted, e.flags.effort());
                    rank(entry) > rank(current)
                }
            };
            if better {
                best = Some((id, entry));
            }
        }
        best.map(|(id, entry)| (id.clone(), entry.flags))
    }

    pub fn forget(&mut self, amnesia: Amnesia) {
        match amnesia {
            Amnesia::Everything => self.entries.clear(),
            Amnesia::Bad => {
                for per in self.entries.values_mut() {
                    per.retain(|_, e| e.verdict != Verdict::Bad);
                }
                self.entries.retain(|_, per| !per.is_empty());
            }
        }
    }

    /// Canonical text form; equal wisdom exports byte-identical text.
    #[must_use]
    pub fn export(&self) -> String {
        let mut out = format!("{HEADER_PREFIX}{WISDOM_VERSION}\n");
        for (hash, id, entry) in self.iter() {
            let _ = writeln!(
                out,
                "  ({} {} {} #x{:x} {} #{})",
                id.name,
                id.reg_id,
                entry.verdict.as_str(),
                entry.flags.bits(),
                hash.to_hex(),
                checksum(id, entry, hash),
            );
        }
        out.push_str(")\n");
        out
    }

    /// Merge exported text. Every entry line is validated on its own;
    /// invalid lines are reported and skipped, later lines override
    /// earlier ones.
    pub fn import(&mut self, text: &str, registry: &Registry) -> ImportReport {
        let mut report = ImportReport::default();
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let header_ok = match lines.next() {
            None => {
                report.corrupt = Some(FftError::WisdomCorrupt {
                    line: 1,
                    reason: "empty wisdom".into(),
                });
                return report;
            }
            Some((no, header)) => match header.strip_prefix(HEADER_PREFIX) {
                Some(version) if version == WISDOM_VERSION.to_string() => true,
                Some(version) => {
                    report.corrupt = Some(FftError::WisdomCorrupt {
                        line: no,
                        reason: format!("unsupported wisdom version {version}"),
                    });
                    false
                }
                None => {
                    report.corrupt = Some(FftError::WisdomCorrupt {
                        line: no,
                        reason: "missing wisdom header".into(),
                    });
                    false
                }
            },
        };

        let mut closed = false;
        let mut last = 1;
        for (no, line) in lines {
            last = no;
            if closed {
                report.discarded.push(DiscardedEntry {
                    line: no,
                    reason: "text after closing parenthesis".into(),
                });
                continue;
            }
            if line == ")" {
                closed = true;
                continue;
            }
            if !header_ok {
                report.discarded.push(DiscardedEntry {
                    line: no,
                    reason: "wisdom header rejected".into(),
                });
                continue;
            }
            match parse_entry(line, registry) {
                Ok((hash, id, entry)) => {
                    self.store(hash, id, entry.verdict, entry.flags);
                    report.accepted += 1;
                }
                Err(reason) => report.discarded.push(DiscardedEntry { line: no, reason }),
            }
        }
        if !closed && report.corrupt.is_none() {
            report.corrupt = Some(FftError::WisdomCorrupt {
                line: last,
                reason: "missing closing parenthesis".into(),
            });
        }
        report
    }

    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<(), FftError> {
        let path = path.as_ref();
        fs::write(path, self.export()).map_err(|source| FftError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn import_from_file(
        &mut self,
        path: impl AsRef<Path>,
        registry: &Registry,
    ) -> Result<ImportReport, FftError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FftError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.import(&text, registry))
    }
}

fn checksum(id: &SolverId, entry: &WisdomEntry, hash: &ProblemHash) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(id.name.as_bytes());
    hasher.update(&[0]);
    hasher.update(&id.reg_id.to_le_bytes());
    hasher.update(entry.verdict.as_str().as_bytes());
    hasher.update(&entry.flags.bits().to_le_bytes());
    hasher.update(hash.as_bytes());
    hasher.finalize().as_bytes()[..8]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn parse_entry(
    line: &str,
    registry: &Registry,
) -> Result<(ProblemHash, SolverId, WisdomEntry), String> {
    let body = line
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or("entry is not parenthesized")?;
    let fields = body.split_whitespace().collect::<Vec<_>>();
    let [name, reg_id, verdict, flags, hash, sum] = fields[..] else {
        return Err(format!("expected 6 fields, found {}", fields.len()));
    };
    let reg_id = reg_id
        .parse::<u32>()
        .map_err(|_| format!("bad registration id {reg_id:?}"))?;
    let verdict = match verdict {
        "good" => Verdict::Good,
        "bad" => Verdict::Bad,
        other => return Err(format!("bad verdict {other:?}")),
    };
    let flags = flags
        .strip_prefix("#x")
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .and_then(PlannerFlags::from_bits)
        .ok_or_else(|| format!("bad flags {flags:?}"))?;
    let hash = ProblemHash::from_hex(hash).ok_or_else(|| format!("bad problem hash {hash:?}"))?;
    let sum = sum.strip_prefix('#').ok_or("checksum lacks '#'")?;
    let id = SolverId::new(name, reg_id);
    let entry = WisdomEntry { verdict, flags };
    if checksum(&id, &entry, &hash) != sum {
        return Err("checksum mismatch".into());
    }
    if !registry.contains(&id) {
        return Err(format!("unknown solver {id}"));
    }
    Ok((hash, id, entry))
}

#[cfg(test)]
mod tests {
    use super::{Amnesia, Verdict, Wisdom, WisdomEntry};
    use crate::error::FftError;
    use crate::flags::PlannerFlags;
    use crate::problem::ProblemHash;
    use crate::solver::{Backends, SolverId, build_registry};

    fn hash(byte: u8) -> ProblemHash {
        ProblemHash::from_bytes([byte; 16])
    }

    fn sample() -> Wisdom {
        let mut w = Wisdom::new();
        w.store(hash(1), SolverId::new("direct/n1_4", 0), Verdict::Good, PlannerFlags::ESTIMATE);
        w.store(hash(1), SolverId::new("dft-generic", 0), Verdict::Bad, PlannerFlags::ESTIMATE);
        w.store(hash(2), SolverId::new("vrank-geq1", 1), Verdict::Good, PlannerFlags::MEASURE);
        w
    }

    #[test]
    fn store_and_lookup() {
        let w = sample();
        assert_eq!(w.len(), 3);
        assert_eq!(w.lookup(&hash(1), &SolverId::new("direct/n1_4", 0)), Verdict::Good);
        assert_eq!(w.lookup(&hash(1), &SolverId::new("dft-generic", 0)), Verdict::Bad);
        assert_eq!(w.lookup(&hash(3), &SolverId::new("nop", 0)), Verdict::Unknown);
    }

    #[test]
    fn one_good_winner_per_flags() {
        let mut w = sample();
        w.store(hash(1), SolverId::new("ct-dit/t1_2", 0), Verdict::Good, PlannerFlags::ESTIMATE);
        assert_eq!(w.lookup(&hash(1), &SolverId::new("direct/n1_4", 0)), Verdict::Unknown);
        assert_eq!(
            w.winner(&hash(1), PlannerFlags::ESTIMATE).map(|(id, _)| id),
            Some(SolverId::new("ct-dit/t1_2", 0))
        );
    }

    #[test]
    fn winner_respects_effort_and_restrictions() {
        let w = sample();
        // Estimate wisdom cannot answer a measured request.
        assert!(w.winner(&hash(1), PlannerFlags::MEASURE).is_none());
        // NO_SIMD must match the entry exactly.
        assert!(w.winner(&hash(2), PlannerFlags::NO_SIMD).is_none());
        // A more patient entry answers a less patient request, including
        // one that would have skipped indirect and split solvers.
        assert!(w.winner(&hash(2), PlannerFlags::ESTIMATE).is_some());
        let estimate = PlannerFlags::ESTIMATE.normalize().expect("estimate");
        assert!(w.winner(&hash(2), estimate).is_some());
        // Normalized estimate wisdom skipped indirect solvers, so it cannot
        // answer a patient estimate request that searches them.
        let mut w = Wisdom::new();
        w.store(hash(5), SolverId::new("indirect", 0), Verdict::Good, estimate);
        assert!(w.winner(&hash(5), estimate).is_some());
        assert!(w.winner(&hash(5), PlannerFlags::ESTIMATE | PlannerFlags::PATIENT).is_none());
    }

    #[test]
    fn winner_prefers_exact_flags() {
        let mut w = Wisdom::new();
        let patient = PlannerFlags::PATIENT;
        w.store(hash(4), SolverId::new("a", 0), Verdict::Good, patient);
        w.store(hash(4), SolverId::new("b", 0), Verdict::Good, PlannerFlags::MEASURE);
        let (id, flags) = w.winner(&hash(4), PlannerFlags::MEASURE).expect("winner");
        assert_eq!(id, SolverId::new("b", 0));
        assert_eq!(flags, PlannerFlags::MEASURE);
        let (id, _) = w.winner(&hash(4), PlannerFlags::ESTIMATE).expect("winner");
        assert_eq!(id, SolverId::new("a", 0));
    }

    #[test]
    fn forget_bad_keeps_good() {
        let mut w = sample();
        w.forget(Amnesia::Bad);
        assert_eq!(w.len(), 2);
        w.forget(Amnesia::Everything);
        assert!(w.is_empty());
    }

    #[test]
    fn export_import_roundtrip_is_lossless() {
        let registry = build_registry(&Backends::default());
        let w = sample();
        let text = w.export();
        let mut back = Wisdom::new();
        let report = back.import(&text, &registry);
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.accepted, 3);
        assert_eq!(back, w);
        assert_eq!(back.export(), text);
    }

    #[test]
    fn corrupt_lines_are_skipped_individually() {
        let registry = build_registry(&Backends::default());
        let text = sample().export();
        let mut lines = text.lines().map(str::to_owned).collect::<Vec<_>>();
        lines[1] = lines[1].replace(" bad ", " good ");
        lines.insert(2, "  (garbage".to_owned());
        let damaged = lines.join("\n");
        let mut back = Wisdom::new();
        let report = back.import(&damaged, &registry);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.discarded.len(), 2);
        assert!(report.discarded.iter().any(|d| d.reason == "checksum mismatch"));
        assert!(report.corrupt.is_none());
    }

    #[test]
    fn unknown_solver_is_discarded() {
        let registry = build_registry(&Backends::generic_only());
        let mut w = Wisdom::new();
        w.store(hash(9), SolverId::new("direct-simd/n1fv_4", 0), Verdict::Good, PlannerFlags::ESTIMATE);
        let mut back = Wisdom::new();
        let report = back.import(&w.export(), &registry);
        assert_eq!(report.accepted, 0);
        assert!(report.discarded[0].reason.starts_with("unknown solver"));
    }

    #[test]
    fn version_mismatch_discards_everything() {
        let registry = build_registry(&Backends::default());
        let text = sample().export().replace("(fdft-wisdom 1", "(fdft-wisdom 7");
        let mut back = Wisdom::new();
        let report = back.import(&text, &registry);
        assert_eq!(report.accepted, 0);
        assert_eq!(report.discarded.len(), 3);
        assert!(matches!(report.corrupt, Some(FftError::WisdomCorrupt { line: 1, .. })));
        assert!(back.is_empty());
    }

    #[test]
    fn truncated_text_keeps_complete_lines() {
        let registry = build_registry(&Backends::default());
        let text = sample().export();
        let cut = text.trim_end().trim_end_matches(')').trim_end();
        let mut back = Wisdom::new();
        let report = back.import(cut, &registry);
        assert_eq!(report.accepted, 3);
        assert!(matches!(report.corrupt, Some(FftError::WisdomCorrupt { .. })));
    }

    #[test]
    fn later_lines_override_earlier() {
        let registry = build_registry(&Backends::default());
        let mut a = Wisdom::new();
        a.store(hash(5), SolverId::new("nop", 0), Verdict::Bad, PlannerFlags::ESTIMATE);
        let mut b = Wisdom::new();
        b.store(hash(5), SolverId::new("nop", 0), Verdict::Good, PlannerFlags::ESTIMATE);
        let mut merged = Wisdom::new();
        merged.import(&a.export(), &registry);
        merged.import(&b.export(), &registry);
        assert_eq!(
            merged.entry(&hash(5), &SolverId::new("nop", 0)),
            Some(&WisdomEntry {
                verdict: Verdict::Good,
                flags: PlannerFlags::ESTIMATE
            })
        );
    }

    #[test]
    fn file_roundtrip_and_missing_file() {
        let registry = build_registry(&Backends::default());
        let dir = std::env::temp_dir().join(format!("fdft-wisdom-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join("wisdom.txt");
        let w = sample();
        w.export_to_file(&path).expect("export should succeed");
        let mut back = Wisdom::new();
        let report = back
            .import_from_file(&path, &registry)
            .expect("import should succeed");
        assert_eq!(report.accepted, 3);
        assert_eq!(back, w);
        let missing = back.import_from_file(dir.join("absent.txt"), &registry);
        assert!(matches!(missing, Err(FftError::Io { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
