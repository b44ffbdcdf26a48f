//! Per-detector views of a catalog

use crate::catalog::{SftCatalog, SftDescriptor};
use sftkit_formats::Detector;
use tracing::debug;

/// Catalog entries grouped by detector
///
/// Borrows the descriptors of the catalog it was built from, so the catalog
/// must outlive the view. Within a detector, entries keep catalog order;
/// detectors are sorted alphabetically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogView<'a> {
    detectors: Vec<(Detector, Vec<&'a SftDescriptor>)>,
}

impl<'a> CatalogView<'a> {
    /// Number of detectors
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    /// Whether the view holds no detector
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Detector codes in view order
    pub fn detectors(&self) -> impl Iterator<Item = Detector> + '_ {
        self.detectors.iter().map(|(detector, _)| *detector)
    }

    /// Entries for one detector
    pub fn get(&self, detector: Detector) -> Option<&[&'a SftDescriptor]> {
        self.detectors
            .iter()
            .find(|(d, _)| *d == detector)
            .map(|(_, entries)| entries.as_slice())
    }

    /// `(detector, entries)` pairs in view order
    pub fn iter(&self) -> impl Iterator<Item = (Detector, &[&'a SftDescriptor])> + '_ {
        self.detectors
            .iter()
            .map(|(detector, entries)| (*detector, entries.as_slice()))
    }
}

/// Split `catalog` into one entry list per detector.
pub fn partition_by_detector(catalog: &SftCatalog) -> CatalogView<'_> {
    let mut detectors: Vec<(Detector, Vec<&SftDescriptor>)> = Vec::new();

    for entry in catalog {
        let detector = entry.detector();
        match detectors.iter_mut().find(|(d, _)| *d == detector) {
            Some((_, entries)) => entries.push(entry),
            None => detectors.push((detector, vec![entry])),
        }
    }

    detectors.sort_by_key(|(detector, _)| *detector);
    debug!(
        "Partitioned {} SFTs into {} detectors",
        catalog.len(),
        detectors.len()
    );
    CatalogView { detectors }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::sample_sft;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn det(code: &str) -> Detector {
        code.parse().unwrap()
    }

    #[test]
    fn test_partition_groups_and_sorts() {
        let catalog = SftCatalog::from_sfts([
            sample_sft("V1", 100, 10.0, 0.5, 2),
            sample_sft("H1", 200, 10.0, 0.5, 2),
            sample_sft("L1", 300, 10.0, 0.5, 2),
            sample_sft("H1", 400, 10.0, 0.5, 2),
        ])
        .unwrap();

        let view = partition_by_detector(&catalog);
        assert_eq!(view.len(), 3);
        assert_eq!(
            view.detectors().collect::<Vec<_>>(),
            [det("H1"), det("L1"), det("V1")]
        );

        let h1: Vec<i32> = view
            .get(det("H1"))
            .unwrap()
            .iter()
            .map(|e| e.epoch().seconds)
            .collect();
        assert_eq!(h1, [200, 400]);
        assert!(view.get(det("G1")).is_none());

        let total: usize = view.iter().map(|(_, entries)| entries.len()).sum();
        assert_eq!(total, catalog.len());
    }

    #[test]
    fn test_partition_of_empty_catalog() {
        let catalog = SftCatalog::default();
        assert!(partition_by_detector(&catalog).is_empty());
    }

    #[test]
    fn test_view_borrows_catalog_entries() {
        let catalog = SftCatalog::from_sfts([sample_sft("H1", 100, 10.0, 0.5, 2)]).unwrap();
        let view = partition_by_detector(&catalog);
        let entry = view.get(det("H1")).unwrap()[0];
        assert!(std::ptr::eq(entry, catalog.get(0).unwrap()));
    }

    proptest! {
        #[test]
        fn partition_keeps_every_entry_in_epoch_order(
            blocks in prop::collection::vec((0usize..3, 0i32..1000), 0..40)
        ) {
            let codes = ["H1", "L1", "V1"];
            let catalog = SftCatalog::from_sfts(
                blocks.iter().map(|&(d, t)| sample_sft(codes[d], t, 10.0, 0.5, 1)),
            )
            .unwrap();
            let view = partition_by_detector(&catalog);

            let total: usize = view.iter().map(|(_, entries)| entries.len()).sum();
            prop_assert_eq!(total, blocks.len());
            for (detector, entries) in view.iter() {
                prop_assert!(entries.iter().all(|e| e.detector() == detector));
                prop_assert!(entries.windows(2).all(|w| w[0].epoch() <= w[1].epoch()));
            }
        }
    }
}
