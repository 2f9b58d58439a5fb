#![no_main]

use fdft::{Planner, PlannerConfig, PlannerFlags};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut planner = Planner::new(PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE));
    let report = planner.import_wisdom(text);
    if report.is_clean() {
        // Accepted wisdom must export to text that imports cleanly again.
        let exported = planner.export_wisdom();
        let mut again = Planner::new(PlannerConfig::default());
        assert!(again.import_wisdom(&exported).is_clean());
        assert_eq!(again.export_wisdom(), exported);
    }
});
