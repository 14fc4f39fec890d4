pub mod jsonl_detection_recorder;
pub mod monitor_loop;
