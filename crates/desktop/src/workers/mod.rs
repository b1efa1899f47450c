pub mod detection_worker;
pub mod pipeline_cache;

#[cfg(test)]
mod test_support;
