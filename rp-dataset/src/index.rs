//! The index translation table.

use crate::{annotation::ClipAnnotation, common::*, store::AnnotationStore};

/// Selects how indices map to samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplingMode {
    /// One entry per `(clip, offset, interval)`, rendered as a frame pair.
    Pair,
    /// One entry per clip, rendered as a randomly placed frame window.
    Sequence,
}

/// A training sample address.
///
/// It satisfies `1 <= interval <= max_interval` and `offset + interval <= traj_len - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    pub clip_index: usize,
    pub offset: usize,
    pub interval: usize,
}

#[derive(Debug, Clone)]
enum IndexTable {
    Pairs(Vec<IndexEntry>),
    Clips(Vec<usize>),
}

/// Immutable clip records plus the enumeration of samples over them.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    max_interval: usize,
    max_traj_len: usize,
    clips: Vec<ClipAnnotation>,
    table: IndexTable,
    interval_lut: Vec<Vec<IndexEntry>>,
    excluded_clips: usize,
}

impl SampleIndex {
    /// Scan every clip of the annotation store in its native order.
    ///
    /// In pair mode this enumerates every `(offset, interval)` of every clip, costing
    /// `O(total trajectory frames * max_interval)` time and one entry of memory per sample.
    /// It is the dominant one-time cost of building a reader.
    pub fn build<A>(store: &A, max_interval: usize, mode: SamplingMode) -> Result<Self>
    where
        A: AnnotationStore + ?Sized,
    {
        let names = store.clip_names()?;
        let clips: Vec<_> = names
            .iter()
            .map(|name| {
                store
                    .load_clip(name)
                    .with_context(|| format!("failed to load clip '{}'", name))
            })
            .try_collect()?;
        Self::from_clips(clips, max_interval, mode)
    }

    /// Build the index over clips given in store order.
    pub fn from_clips<I>(clips: I, max_interval: usize, mode: SamplingMode) -> Result<Self>
    where
        I: IntoIterator<Item = ClipAnnotation>,
    {
        ensure!(max_interval >= 1, "max_interval must be positive");

        let clips: Vec<_> = clips.into_iter().collect();
        let max_traj_len = clips.iter().map(|clip| clip.traj_len).max().unwrap_or(0);
        let mut interval_lut = vec![vec![]; max_interval];

        let mut excluded_clips = 0;

        let table = match mode {
            SamplingMode::Pair => {
                let mut entries = vec![];

                for (clip_index, clip) in clips.iter().enumerate() {
                    for interval in 1..=max_interval {
                        for offset in 0..clip.traj_len.saturating_sub(interval) {
                            let entry = IndexEntry {
                                clip_index,
                                offset,
                                interval,
                            };
                            entries.push(entry);
                            interval_lut[interval - 1].push(entry);
                        }
                    }
                }

                IndexTable::Pairs(entries)
            }
            SamplingMode::Sequence => {
                let (usable, short): (Vec<_>, Vec<_>) = clips
                    .iter()
                    .enumerate()
                    .partition(|(_, clip)| clip.traj_len >= max_interval);

                excluded_clips = short.len();
                if excluded_clips > 0 {
                    warn!(
                        "skipped {} clips shorter than the {}-frame evaluation window, \
                         removing {} of {} evaluation samples",
                        excluded_clips,
                        max_interval,
                        excluded_clips,
                        clips.len()
                    );
                }

                IndexTable::Clips(usable.into_iter().map(|(index, _)| index).collect())
            }
        };

        if max_traj_len < max_interval + 1 {
            warn!(
                "max trajectory duration less than max_interval+1, {} vs {}",
                max_traj_len,
                max_interval + 1
            );
        }

        Ok(Self {
            max_interval,
            max_traj_len,
            clips,
            table,
            interval_lut,
            excluded_clips,
        })
    }

    pub fn mode(&self) -> SamplingMode {
        match self.table {
            IndexTable::Pairs(_) => SamplingMode::Pair,
            IndexTable::Clips(_) => SamplingMode::Sequence,
        }
    }

    /// The number of addressable samples.
    pub fn len(&self) -> usize {
        match &self.table {
            IndexTable::Pairs(entries) => entries.len(),
            IndexTable::Clips(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_interval(&self) -> usize {
        self.max_interval
    }

    /// The longest `traj_len` among all clips.
    pub fn max_traj_len(&self) -> usize {
        self.max_traj_len
    }

    pub fn clips(&self) -> &[ClipAnnotation] {
        &self.clips
    }

    pub fn clip(&self, clip_index: usize) -> Option<&ClipAnnotation> {
        self.clips.get(clip_index)
    }

    /// The pair entry at `index`. It is `None` in sequence mode or out of range.
    pub fn entry(&self, index: usize) -> Option<IndexEntry> {
        match &self.table {
            IndexTable::Pairs(entries) => entries.get(index).copied(),
            IndexTable::Clips(_) => None,
        }
    }

    /// The clip addressed by `index`, in either mode.
    pub fn clip_index(&self, index: usize) -> Option<usize> {
        match &self.table {
            IndexTable::Pairs(entries) => entries.get(index).map(|entry| entry.clip_index),
            IndexTable::Clips(indices) => indices.get(index).copied(),
        }
    }

    /// All pair entries in index order. It is empty in sequence mode.
    pub fn pair_entries(&self) -> &[IndexEntry] {
        match &self.table {
            IndexTable::Pairs(entries) => entries,
            IndexTable::Clips(_) => &[],
        }
    }

    /// The entries sharing the frame gap `interval`, in index order.
    pub fn interval_entries(&self, interval: usize) -> &[IndexEntry] {
        interval
            .checked_sub(1)
            .and_then(|slot| self.interval_lut.get(slot))
            .map(|entries| entries.as_slice())
            .unwrap_or(&[])
    }

    /// The number of clips left out of the sequence table for being shorter than the window.
    /// It is zero in pair mode.
    pub fn excluded_clips(&self) -> usize {
        self.excluded_clips
    }

    /// The interval lookup table. Slot `k` holds the entries with interval `k + 1`.
    pub fn interval_lut(&self) -> &[Vec<IndexEntry>] {
        &self.interval_lut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryAnnotationStore;

    fn clip(name: &str, traj_len: usize, traj_count: usize) -> ClipAnnotation {
        ClipAnnotation::new(
            name,
            traj_len,
            100,
            traj_count,
            Array3::zeros([traj_count, traj_len, 2]),
            format!("vid-{}", name),
        )
        .unwrap()
    }

    #[test]
    fn pair_entry_count() {
        let index = SampleIndex::from_clips(vec![clip("a", 5, 3)], 3, SamplingMode::Pair).unwrap();
        assert_eq!(index.len(), 4 + 3 + 2);
        assert_eq!(index.interval_entries(1).len(), 4);
        assert_eq!(index.interval_entries(2).len(), 3);
        assert_eq!(index.interval_entries(3).len(), 2);
        assert!(index.interval_entries(0).is_empty());
        assert!(index.interval_entries(4).is_empty());
    }

    #[test]
    fn pair_entries_respect_clip_bounds() {
        let clips = vec![clip("a", 5, 3), clip("b", 1, 2), clip("c", 12, 1), clip("d", 3, 0)];
        let max_interval = 4;
        let index = SampleIndex::from_clips(clips, max_interval, SamplingMode::Pair).unwrap();

        let expect: usize = [5usize, 1, 12, 3]
            .iter()
            .map(|&len| (1..=max_interval).map(|int| len.saturating_sub(int)).sum::<usize>())
            .sum();
        assert_eq!(index.len(), expect);

        index.pair_entries().iter().for_each(|entry| {
            let traj_len = index.clip(entry.clip_index).unwrap().traj_len;
            assert!(1 <= entry.interval && entry.interval <= max_interval);
            assert!(entry.offset + entry.interval <= traj_len - 1);
        });

        let lut_total: usize = index.interval_lut().iter().map(|slot| slot.len()).sum();
        assert_eq!(lut_total, index.len());
    }

    #[test]
    fn pair_entries_follow_store_order() {
        let store: MemoryAnnotationStore = vec![clip("z", 3, 1), clip("a", 3, 1)]
            .into_iter()
            .collect();
        let index = SampleIndex::build(&store, 1, SamplingMode::Pair).unwrap();

        assert_eq!(index.clips()[0].name, "z");
        let entries: Vec<_> = index
            .pair_entries()
            .iter()
            .map(|entry| (entry.clip_index, entry.offset, entry.interval))
            .collect();
        assert_eq!(entries, vec![(0, 0, 1), (0, 1, 1), (1, 0, 1), (1, 1, 1)]);
        assert_eq!(index.entry(2).unwrap().clip_index, 1);
        assert_eq!(index.clip_index(3), Some(1));
        assert_eq!(index.entry(4), None);
    }

    #[test]
    fn sequence_mode_has_one_entry_per_clip() {
        let clips = vec![clip("a", 10, 2), clip("b", 4, 2), clip("c", 15, 2)];
        let index = SampleIndex::from_clips(clips, 5, SamplingMode::Sequence).unwrap();

        assert_eq!(index.mode(), SamplingMode::Sequence);
        assert_eq!(index.len(), 2);
        assert_eq!(index.clip_index(0), Some(0));
        assert_eq!(index.clip_index(1), Some(2));
        assert_eq!(index.entry(0), None);
        assert!(index.pair_entries().is_empty());
        assert_eq!(index.clips().len(), 3);
        assert_eq!(index.excluded_clips(), 1);
    }

    #[test]
    fn pair_mode_excludes_no_clips() {
        let clips = vec![clip("a", 2, 1), clip("b", 8, 1)];
        let index = SampleIndex::from_clips(clips, 5, SamplingMode::Pair).unwrap();
        assert_eq!(index.excluded_clips(), 0);
        assert_eq!(index.clip_index(0), Some(0));
    }

    #[test]
    fn short_clips_are_not_an_error() {
        let index = SampleIndex::from_clips(vec![clip("a", 3, 1)], 10, SamplingMode::Pair).unwrap();
        assert_eq!(index.max_traj_len(), 3);
        assert_eq!(index.len(), 2 + 1);
        assert!(index.interval_entries(3).is_empty());
    }

    #[test]
    fn empty_store() {
        let index = SampleIndex::from_clips(vec![], 3, SamplingMode::Pair).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.interval_lut().len(), 3);
    }
}
