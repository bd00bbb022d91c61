use super::types::DetectionRegion;

/// Collapse engine output into plain line texts.
///
/// Regions are visited in emission order, then the lines inside each region.
/// Every line is kept as-is: no trimming, deduplication or confidence cut-off.
pub fn flatten(regions: Vec<DetectionRegion>) -> Vec<String> {
    regions
        .into_iter()
        .flat_map(|region| region.lines)
        .map(|line| line.text)
        .collect()
}
