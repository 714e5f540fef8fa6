#![allow(dead_code)]

pub mod registry;

use image_reporter::scanner::ScanTask;

pub fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn task(service: &str, reference: &str) -> ScanTask {
    ScanTask::parse(service, reference).unwrap()
}
