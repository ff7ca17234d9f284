use std::sync::LazyLock;

use prometheus::*;

static METRIC_SAVE_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("im_label_save_count", "count of saved annotations", &["kind"])
        .unwrap()
});

static METRIC_DELETE_COUNT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("im_label_delete_count", "count of deleted annotations").unwrap()
});

static METRIC_RELOAD_ISSUES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "im_label_reload_issue_count",
        "count of index entries skipped while reloading",
        &["kind"]
    )
    .unwrap()
});

static METRIC_RECORDS: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!("im_label_records", "number of annotation records in memory").unwrap()
});

/// 增加保存计数
pub fn inc_save(created: bool) {
    let kind = if created { "created" } else { "updated" };
    METRIC_SAVE_COUNT.with_label_values(&[kind]).inc();
}

pub fn inc_delete() {
    METRIC_DELETE_COUNT.inc();
}

pub fn inc_reload_issue(kind: &str) {
    METRIC_RELOAD_ISSUES.with_label_values(&[kind]).inc();
}

pub fn set_record_count(count: usize) {
    METRIC_RECORDS.set(count as i64);
}

/// 以文本格式导出所有指标
pub fn encode_text() -> anyhow::Result<String> {
    let mut buffer = vec![];
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
