//! Complexity Classifier Module
//!
//! グリッドの構造を検査し、複雑度シグナルの集合を算出するモジュール。
//! シグナルが1つでも存在すれば「複雑」、空集合なら「単純」と判定します。
//! 分類器はグリッドを変更せず、同じ入力に対して常に同じ結果を返します。

use tracing::debug;

use crate::grid::Grid;
use crate::types::CellRange;

/// 複雑度シグナル
///
/// シートが複雑と判定される個別の構造的理由です。各バリアントは
/// 判定の根拠（件数や比率）を保持します。
#[derive(Debug, Clone, PartialEq)]
pub enum ComplexitySignal {
    /// セル結合が存在する
    MergedCells {
        /// 結合範囲の数
        regions: usize,
    },

    /// 空行・空列の帯で区切られた複数のテーブル候補が存在する
    MultiTable {
        /// 行方向の非空帯の数
        row_bands: usize,
        /// 列方向の非空帯の数
        col_bands: usize,
    },

    /// ヘッダー行が行0にない、またはヘッダーの埋まり方がデータ行に
    /// 比べて薄い（ヘッダーが途中から始まる・複数行に分かれている兆候）
    HeaderMisaligned {
        /// 最初の非空行のインデックス
        first_row: u32,
        /// ヘッダー行の非空セル数 / データ行の平均非空セル数
        /// （行0以外で発火した場合はNone）
        fill_ratio: Option<f64>,
    },

    /// セル以外の描画オブジェクト（画像・図形・グラフ）がアンカーされている
    EmbeddedObject {
        /// アンカーされたオブジェクト参照の数
        anchors: usize,
    },

    /// 外接矩形に対する空セルの割合が大きい
    SparseRegion {
        /// 空セルの割合（0.0〜1.0）
        empty_fraction: f64,
    },
}

impl ComplexitySignal {
    /// シグナル名を取得（出力アーティファクトで使用）
    pub fn name(&self) -> &'static str {
        match self {
            ComplexitySignal::MergedCells { .. } => "merged_cells",
            ComplexitySignal::MultiTable { .. } => "multi_table",
            ComplexitySignal::HeaderMisaligned { .. } => "header_misaligned",
            ComplexitySignal::EmbeddedObject { .. } => "embedded_object",
            ComplexitySignal::SparseRegion { .. } => "sparse_region",
        }
    }
}

/// 複雑度の判定結果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplexityVerdict {
    /// 発火したシグナルの集合（判定順で格納、空なら単純）
    pub signals: Vec<ComplexitySignal>,
}

impl ComplexityVerdict {
    /// シートが複雑かどうか
    ///
    /// シグナル集合が非空の場合に限り複雑です。
    pub fn is_complex(&self) -> bool {
        !self.signals.is_empty()
    }

    /// シグナル名のリストを取得
    pub fn signal_names(&self) -> Vec<String> {
        self.signals.iter().map(|s| s.name().to_string()).collect()
    }
}

/// 複雑度分類器
///
/// しきい値は構築時に明示的に渡されます。グローバル状態は参照しません。
#[derive(Debug, Clone)]
pub struct Classifier {
    /// 区切りとみなす空行・空列の最小連続数
    gap_rows: usize,

    /// 疎判定のしきい値（外接矩形に対する空セル割合）
    sparsity_threshold: f64,

    /// ヘッダー行の埋まり方のしきい値（データ行平均に対する割合）
    header_fill_threshold: f64,
}

impl Classifier {
    /// 新しい分類器を生成
    pub fn new(gap_rows: usize, sparsity_threshold: f64, header_fill_threshold: f64) -> Self {
        Self {
            gap_rows,
            sparsity_threshold,
            header_fill_threshold,
        }
    }

    /// グリッドを分類し、複雑度シグナルの集合を返す
    ///
    /// 各シグナルは独立に評価されます。完全に空のグリッドはシグナルを
    /// 持たず「単純」と判定されます（空の扱いは抽出パスの責務）。
    pub fn classify(&self, grid: &Grid) -> ComplexityVerdict {
        let mut signals = Vec::new();

        // 外接矩形がない（完全に空の）グリッドは判定対象外
        let bbox = match grid.bounding_box() {
            Some(bbox) => bbox,
            None => return ComplexityVerdict::default(),
        };

        // 1. merged_cells: 結合範囲が存在するか
        if !grid.merges().is_empty() {
            signals.push(ComplexitySignal::MergedCells {
                regions: grid.merges().len(),
            });
        }

        // 2. multi_table: 空帯で区切られた非空帯が2つ以上あるか
        let row_bands = grid.row_bands(bbox, self.gap_rows).len();
        let col_bands = grid.col_bands(bbox, self.gap_rows).len();
        if row_bands >= 2 || col_bands >= 2 {
            signals.push(ComplexitySignal::MultiTable {
                row_bands,
                col_bands,
            });
        }

        // 3. header_misaligned: 最初の非空行が行0にない、または埋まりが薄い
        if let Some(signal) = self.check_header_alignment(grid, bbox) {
            signals.push(signal);
        }

        // 4. embedded_object: 描画オブジェクトがアンカーされているか
        if grid.drawing_count() > 0 {
            signals.push(ComplexitySignal::EmbeddedObject {
                anchors: grid.drawing_count(),
            });
        }

        // 5. sparse_region: 外接矩形に対する空セル割合
        let empty_fraction = self.empty_fraction(grid, bbox);
        if empty_fraction > self.sparsity_threshold {
            signals.push(ComplexitySignal::SparseRegion { empty_fraction });
        }

        let verdict = ComplexityVerdict { signals };
        debug!(
            sheet = grid.sheet_name(),
            is_complex = verdict.is_complex(),
            signals = ?verdict.signal_names(),
            "classified sheet"
        );
        verdict
    }

    /// ヘッダー整列の検査（内部ヘルパー）
    fn check_header_alignment(&self, grid: &Grid, bbox: CellRange) -> Option<ComplexitySignal> {
        let first_row = bbox.start.row;

        // 最初の非空行が行0でなければ、それだけで発火
        if first_row > 0 {
            return Some(ComplexitySignal::HeaderMisaligned {
                first_row,
                fill_ratio: None,
            });
        }

        // ヘッダー行の非空セル数と、後続データ行の平均非空セル数を比較する。
        // データ行が存在しない場合は比較不能なので発火しない。
        let header_fill = grid.row_fill_count(first_row, bbox.start.col, bbox.end.col);
        let data_fills: Vec<usize> = (first_row + 1..=bbox.end.row)
            .map(|row| grid.row_fill_count(row, bbox.start.col, bbox.end.col))
            .filter(|&count| count > 0)
            .collect();

        if data_fills.is_empty() {
            return None;
        }

        let average = data_fills.iter().sum::<usize>() as f64 / data_fills.len() as f64;
        let ratio = header_fill as f64 / average;
        if ratio < self.header_fill_threshold {
            return Some(ComplexitySignal::HeaderMisaligned {
                first_row,
                fill_ratio: Some(ratio),
            });
        }

        None
    }

    /// 外接矩形に対する空セル割合を計算（内部ヘルパー、マージ解決あり）
    fn empty_fraction(&self, grid: &Grid, bbox: CellRange) -> f64 {
        let (rows, cols) = bbox.size();
        let total = rows as usize * cols as usize;
        if total == 0 {
            return 0.0;
        }

        let filled: usize = (bbox.start.row..=bbox.end.row)
            .map(|row| grid.row_fill_count(row, bbox.start.col, bbox.end.col))
            .sum();

        1.0 - filled as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellCoord, CellRange, CellValue, MergedRegion};

    fn default_classifier() -> Classifier {
        Classifier::new(2, 0.6, 0.5)
    }

    fn string_cell(row: u32, col: u32, s: &str) -> (CellCoord, CellValue) {
        (CellCoord::new(row, col), CellValue::String(s.to_string()))
    }

    /// 5行×3列、結合なし、ヘッダーが行0にある密なグリッド
    fn plain_table_grid() -> Grid {
        let mut cells = Vec::new();
        for (col, header) in ["Name", "Age", "City"].iter().enumerate() {
            cells.push(string_cell(0, col as u32, header));
        }
        for row in 1..5u32 {
            for col in 0..3u32 {
                cells.push(string_cell(row, col, &format!("r{}c{}", row, col)));
            }
        }
        Grid::build("Sheet1".to_string(), cells, vec![], 0)
    }

    #[test]
    fn test_plain_table_is_simple() {
        let verdict = default_classifier().classify(&plain_table_grid());
        assert!(!verdict.is_complex());
        assert!(verdict.signals.is_empty());
    }

    #[test]
    fn test_empty_grid_is_simple() {
        let grid = Grid::build("Sheet1".to_string(), vec![], vec![], 0);
        let verdict = default_classifier().classify(&grid);
        assert!(!verdict.is_complex());
    }

    #[test]
    fn test_merged_cells_signal() {
        let cells = vec![
            string_cell(0, 0, "Q1 Sales"),
            string_cell(1, 0, "100"),
            string_cell(1, 1, "200"),
        ];
        let merge = MergedRegion::new(CellRange::new(
            CellCoord::new(0, 0),
            CellCoord::new(0, 1),
        ));
        let grid = Grid::build("Sheet1".to_string(), cells, vec![merge], 0);

        let verdict = default_classifier().classify(&grid);
        assert!(verdict.is_complex());
        assert!(verdict
            .signals
            .iter()
            .any(|s| matches!(s, ComplexitySignal::MergedCells { regions: 1 })));
    }

    #[test]
    fn test_multi_table_signal_on_row_gap() {
        // 2表が3空行で分かれる
        let mut cells = Vec::new();
        for col in 0..2u32 {
            cells.push(string_cell(0, col, "H"));
            cells.push(string_cell(1, col, "d"));
            cells.push(string_cell(5, col, "H2"));
            cells.push(string_cell(6, col, "d2"));
        }
        let grid = Grid::build("Sheet1".to_string(), cells, vec![], 0);

        let verdict = default_classifier().classify(&grid);
        assert!(verdict.is_complex());
        let multi = verdict
            .signals
            .iter()
            .find(|s| matches!(s, ComplexitySignal::MultiTable { .. }))
            .expect("multi_table signal expected");
        assert_eq!(
            multi,
            &ComplexitySignal::MultiTable {
                row_bands: 2,
                col_bands: 1
            }
        );
    }

    #[test]
    fn test_header_misaligned_when_first_row_not_zero() {
        let cells = vec![
            string_cell(3, 0, "Name"),
            string_cell(3, 1, "Age"),
            string_cell(4, 0, "Alice"),
            string_cell(4, 1, "30"),
        ];
        let grid = Grid::build("Sheet1".to_string(), cells, vec![], 0);

        let verdict = default_classifier().classify(&grid);
        assert!(verdict
            .signals
            .iter()
            .any(|s| matches!(
                s,
                ComplexitySignal::HeaderMisaligned {
                    first_row: 3,
                    fill_ratio: None
                }
            )));
    }

    #[test]
    fn test_header_misaligned_when_header_sparse() {
        // ヘッダー行は1セルのみ、データ行は4セル埋まっている
        let mut cells = vec![string_cell(0, 0, "Title")];
        for row in 1..4u32 {
            for col in 0..4u32 {
                cells.push(string_cell(row, col, "d"));
            }
        }
        let grid = Grid::build("Sheet1".to_string(), cells, vec![], 0);

        let verdict = default_classifier().classify(&grid);
        let signal = verdict
            .signals
            .iter()
            .find(|s| matches!(s, ComplexitySignal::HeaderMisaligned { .. }))
            .expect("header_misaligned signal expected");
        match signal {
            ComplexitySignal::HeaderMisaligned {
                first_row,
                fill_ratio: Some(ratio),
            } => {
                assert_eq!(*first_row, 0);
                assert!(*ratio < 0.5, "ratio = {}", ratio);
            }
            other => panic!("unexpected signal shape: {:?}", other),
        }
    }

    #[test]
    fn test_header_fill_check_skipped_without_data_rows() {
        // ヘッダー1行だけのシートでは比較対象がないため発火しない
        let cells = vec![string_cell(0, 0, "OnlyHeader")];
        let grid = Grid::build("Sheet1".to_string(), cells, vec![], 0);

        let verdict = default_classifier().classify(&grid);
        assert!(!verdict
            .signals
            .iter()
            .any(|s| matches!(s, ComplexitySignal::HeaderMisaligned { .. })));
    }

    #[test]
    fn test_embedded_object_signal() {
        let cells = vec![string_cell(0, 0, "Chart page")];
        let grid = Grid::build("Sheet1".to_string(), cells, vec![], 2);

        let verdict = default_classifier().classify(&grid);
        assert!(verdict
            .signals
            .iter()
            .any(|s| matches!(s, ComplexitySignal::EmbeddedObject { anchors: 2 })));
    }

    #[test]
    fn test_sparse_region_signal() {
        // 10×10の外接矩形に対して4セルのみ埋まっている（96%が空）
        let cells = vec![
            string_cell(0, 0, "a"),
            string_cell(0, 9, "b"),
            string_cell(9, 0, "c"),
            string_cell(9, 9, "d"),
        ];
        let grid = Grid::build("Sheet1".to_string(), cells, vec![], 0);

        let verdict = default_classifier().classify(&grid);
        let signal = verdict
            .signals
            .iter()
            .find(|s| matches!(s, ComplexitySignal::SparseRegion { .. }))
            .expect("sparse_region signal expected");
        match signal {
            ComplexitySignal::SparseRegion { empty_fraction } => {
                assert!((empty_fraction - 0.96).abs() < 1e-9);
            }
            other => panic!("unexpected signal shape: {:?}", other),
        }
    }

    #[test]
    fn test_merge_children_do_not_count_as_empty_for_sparsity() {
        // 1行×4列がすべて1つの結合範囲: 解決後は全セルが埋まっている扱い
        let cells = vec![string_cell(0, 0, "Banner")];
        let merge = MergedRegion::new(CellRange::new(
            CellCoord::new(0, 0),
            CellCoord::new(0, 3),
        ));
        let grid = Grid::build("Sheet1".to_string(), cells, vec![merge], 0);

        let classifier = default_classifier();
        let bbox = grid.bounding_box().unwrap();
        assert_eq!(classifier.empty_fraction(&grid, bbox), 0.0);
    }

    #[test]
    fn test_classifier_is_deterministic() {
        let grid = plain_table_grid();
        let classifier = default_classifier();
        assert_eq!(classifier.classify(&grid), classifier.classify(&grid));
    }

    // プロパティベーステスト
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// 結合なし・行0ヘッダー・全セル充填のグリッドは常に単純
            #[test]
            fn dense_grids_are_simple(rows in 2u32..8, cols in 2u32..6) {
                let mut cells = Vec::new();
                for row in 0..rows {
                    for col in 0..cols {
                        cells.push((
                            CellCoord::new(row, col),
                            CellValue::String(format!("r{}c{}", row, col)),
                        ));
                    }
                }
                let grid = Grid::build("Sheet1".to_string(), cells, vec![], 0);
                let verdict = default_classifier().classify(&grid);
                prop_assert!(verdict.signals.is_empty());
            }

            /// 結合範囲を1つでも持つグリッドは常にmerged_cellsを含む
            #[test]
            fn merged_grids_always_signal_merged_cells(
                rows in 2u32..8,
                cols in 2u32..6,
                merge_cols in 2u32..4,
            ) {
                let mut cells = Vec::new();
                for row in 0..rows {
                    for col in 0..cols {
                        cells.push((
                            CellCoord::new(row, col),
                            CellValue::String(format!("r{}c{}", row, col)),
                        ));
                    }
                }
                let span = merge_cols.min(cols) - 1;
                let merge = MergedRegion::new(CellRange::new(
                    CellCoord::new(0, 0),
                    CellCoord::new(0, span),
                ));
                let grid = Grid::build("Sheet1".to_string(), cells, vec![merge], 0);
                let verdict = default_classifier().classify(&grid);
                let has_merged_signal = verdict
                    .signals
                    .iter()
                    .any(|s| matches!(s, ComplexitySignal::MergedCells { .. }));
                prop_assert!(has_merged_signal);
            }
        }
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(
            ComplexitySignal::MergedCells { regions: 1 }.name(),
            "merged_cells"
        );
        assert_eq!(
            ComplexitySignal::MultiTable {
                row_bands: 2,
                col_bands: 1
            }
            .name(),
            "multi_table"
        );
        assert_eq!(
            ComplexitySignal::HeaderMisaligned {
                first_row: 0,
                fill_ratio: None
            }
            .name(),
            "header_misaligned"
        );
        assert_eq!(
            ComplexitySignal::EmbeddedObject { anchors: 1 }.name(),
            "embedded_object"
        );
        assert_eq!(
            ComplexitySignal::SparseRegion {
                empty_fraction: 0.9
            }
            .name(),
            "sparse_region"
        );
    }
}
