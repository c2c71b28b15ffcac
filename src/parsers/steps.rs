//! # 离子步 / 电子步对齐
//!
//! 把电子步触发行号按离子步触发行号划分成桶：第 k 个桶包含
//! `ionic[k-1] < e <= ionic[k]` 的电子步，第一个离子步之前的边界相当于 -1。
//! 最后一个离子步之后的电子步不属于任何桶（该离子步尚未完成）。
//!
//! 两个序列都是升序，所以一次归并遍历即可。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar/energy.rs` 使用
//! - 无外部模块依赖

/// 按离子步划分电子步行号
pub fn partition(ionic: &[usize], electronic: &[usize]) -> Vec<Vec<usize>> {
    // 尚未分配的电子步，起点即上一个边界
    let mut rest = electronic;
    ionic
        .iter()
        .map(|&boundary| {
            let split = rest.partition_point(|&e| e <= boundary);
            let (bucket, tail) = rest.split_at(split);
            rest = tail;
            bucket.to_vec()
        })
        .collect()
}
