//! Grid Module
//!
//! スパースなセルデータから稠密なグリッド構造への変換を提供するモジュール。
//! セル結合を考慮した空判定と、読み取り時のマージ解決ビューを実装します。

use crate::types::{CellCoord, CellRange, CellValue, MergedRegion};

/// 1シート分の論理グリッド
///
/// シート原点(0, 0)に固定された稠密な2次元配列として保持します。
/// calamineの使用範囲がシート先頭から始まらない場合でも、絶対座標を
/// 保存するために先頭からの空セルを補います（ヘッダー位置判定に必要）。
///
/// # 不変条件
///
/// 結合範囲内の親セル以外のセルは「合成的に空」です。空判定および
/// 抽出処理は親セルの値へ解決しなければならず、独立した空セルとして
/// 扱ってはなりません。`effective_value` / `is_effectively_empty` が
/// この解決を担います。
#[derive(Debug, Clone)]
pub struct Grid {
    /// シート名
    sheet_name: String,

    /// グリッドデータ（行 × 列、シート原点から稠密）
    cells: Vec<Vec<CellValue>>,

    /// セル結合範囲のリスト（互いに重ならない）
    merges: Vec<MergedRegion>,

    /// シート内にアンカーされた描画オブジェクト（画像・図形・グラフ）の数
    drawing_count: usize,
}

impl Grid {
    /// スパースなセルデータから稠密なグリッド構造を構築
    ///
    /// # 引数
    ///
    /// * `sheet_name` - シート名
    /// * `cells` - 絶対座標付きのセルデータ
    /// * `merges` - セル結合範囲のリスト
    /// * `drawing_count` - 描画オブジェクトのアンカー数
    pub fn build(
        sheet_name: String,
        cells: Vec<(CellCoord, CellValue)>,
        merges: Vec<MergedRegion>,
        drawing_count: usize,
    ) -> Self {
        // 1. グリッドサイズの決定（結合範囲の末端も含める）
        let (rows, cols) = Self::determine_grid_size(&cells, &merges);

        // 2. 空のグリッドを初期化し、セルデータを配置
        let mut grid_cells = vec![vec![CellValue::Empty; cols]; rows];
        for (coord, value) in cells {
            if (coord.row as usize) < rows && (coord.col as usize) < cols {
                grid_cells[coord.row as usize][coord.col as usize] = value;
            }
        }

        Self {
            sheet_name,
            cells: grid_cells,
            merges,
            drawing_count,
        }
    }

    /// グリッドサイズを決定（内部ヘルパー）
    ///
    /// セル座標と結合範囲の末端から最大行・列を算出します。
    fn determine_grid_size(
        cells: &[(CellCoord, CellValue)],
        merges: &[MergedRegion],
    ) -> (usize, usize) {
        let mut max_row: Option<u32> = None;
        let mut max_col: Option<u32> = None;

        for (coord, _) in cells {
            max_row = Some(max_row.map_or(coord.row, |r: u32| r.max(coord.row)));
            max_col = Some(max_col.map_or(coord.col, |c: u32| c.max(coord.col)));
        }
        for merge in merges {
            max_row = Some(max_row.map_or(merge.range.end.row, |r| r.max(merge.range.end.row)));
            max_col = Some(max_col.map_or(merge.range.end.col, |c| c.max(merge.range.end.col)));
        }

        match (max_row, max_col) {
            (Some(r), Some(c)) => ((r + 1) as usize, (c + 1) as usize),
            _ => (0, 0),
        }
    }

    /// シート名を取得
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// 行数を取得
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// 列数を取得
    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, |row| row.len())
    }

    /// セル結合範囲のリストを取得
    pub fn merges(&self) -> &[MergedRegion] {
        &self.merges
    }

    /// 描画オブジェクトのアンカー数を取得
    pub fn drawing_count(&self) -> usize {
        self.drawing_count
    }

    /// 指定座標の生の値を取得（マージ解決なし）
    pub fn raw_value(&self, coord: CellCoord) -> &CellValue {
        self.cells
            .get(coord.row as usize)
            .and_then(|row| row.get(coord.col as usize))
            .unwrap_or(&CellValue::Empty)
    }

    /// 指定座標を含む結合範囲を取得
    pub fn merge_at(&self, coord: CellCoord) -> Option<&MergedRegion> {
        self.merges.iter().find(|m| m.contains(coord))
    }

    /// 指定座標の論理値を取得（マージ解決あり）
    ///
    /// 結合範囲内の親セル以外は親セルの値へ解決されます。
    pub fn effective_value(&self, coord: CellCoord) -> &CellValue {
        match self.merge_at(coord) {
            Some(merge) => self.raw_value(merge.anchor),
            None => self.raw_value(coord),
        }
    }

    /// 指定座標が論理的に空かどうかを判定（マージ解決あり）
    pub fn is_effectively_empty(&self, coord: CellCoord) -> bool {
        self.effective_value(coord).is_empty()
    }

    /// 行内の非空セル数を数える（マージ解決あり）
    pub fn row_fill_count(&self, row: u32, col_start: u32, col_end: u32) -> usize {
        (col_start..=col_end)
            .filter(|&col| !self.is_effectively_empty(CellCoord::new(row, col)))
            .count()
    }

    /// 列内の非空セル数を数える（マージ解決あり）
    pub fn col_fill_count(&self, col: u32, row_start: u32, row_end: u32) -> usize {
        (row_start..=row_end)
            .filter(|&row| !self.is_effectively_empty(CellCoord::new(row, col)))
            .count()
    }

    /// 非空セルの外接矩形を計算（マージ解決あり）
    ///
    /// # 戻り値
    ///
    /// * `Some(CellRange)` - 非空セルが1つ以上存在する場合
    /// * `None` - グリッドが完全に空の場合
    pub fn bounding_box(&self) -> Option<CellRange> {
        let mut min_row = None;
        let mut max_row = None;
        let mut min_col = None;
        let mut max_col = None;

        for row in 0..self.rows() as u32 {
            for col in 0..self.cols() as u32 {
                if !self.is_effectively_empty(CellCoord::new(row, col)) {
                    min_row = Some(min_row.map_or(row, |r: u32| r.min(row)));
                    max_row = Some(max_row.map_or(row, |r: u32| r.max(row)));
                    min_col = Some(min_col.map_or(col, |c: u32| c.min(col)));
                    max_col = Some(max_col.map_or(col, |c: u32| c.max(col)));
                }
            }
        }

        match (min_row, max_row, min_col, max_col) {
            (Some(r0), Some(r1), Some(c0), Some(c1)) => Some(CellRange::new(
                CellCoord::new(r0, c0),
                CellCoord::new(r1, c1),
            )),
            _ => None,
        }
    }

    /// 指定範囲内で、空行の帯で区切られた非空の行帯を走査
    ///
    /// `gap`行以上連続する完全な空行だけが区切りとして扱われます。
    /// それ未満の空行は同じ帯に含まれます（表内の単発の空行を
    /// 別テーブルと誤認しないため）。
    ///
    /// # 戻り値
    ///
    /// 非空の行帯の（開始行, 終了行）のリスト（両端を含む、上から順）
    pub fn row_bands(&self, rect: CellRange, gap: usize) -> Vec<(u32, u32)> {
        let blank: Vec<bool> = (rect.start.row..=rect.end.row)
            .map(|row| self.row_fill_count(row, rect.start.col, rect.end.col) == 0)
            .collect();
        Self::scan_bands(&blank, gap)
            .into_iter()
            .map(|(s, e)| (rect.start.row + s, rect.start.row + e))
            .collect()
    }

    /// 指定範囲内で、空列の帯で区切られた非空の列帯を走査
    ///
    /// `row_bands`の列方向版です。
    pub fn col_bands(&self, rect: CellRange, gap: usize) -> Vec<(u32, u32)> {
        let blank: Vec<bool> = (rect.start.col..=rect.end.col)
            .map(|col| self.col_fill_count(col, rect.start.row, rect.end.row) == 0)
            .collect();
        Self::scan_bands(&blank, gap)
            .into_iter()
            .map(|(s, e)| (rect.start.col + s, rect.start.col + e))
            .collect()
    }

    /// 空フラグ列から非空帯を抽出（内部ヘルパー）
    ///
    /// `gap`以上連続する空だけを区切りとみなし、前後の非空帯の
    /// （開始, 終了）相対インデックスを返します。
    fn scan_bands(blank: &[bool], gap: usize) -> Vec<(u32, u32)> {
        let mut bands: Vec<(u32, u32)> = Vec::new();
        let mut band_start: Option<usize> = None;
        let mut blank_run = 0usize;

        for (i, &is_blank) in blank.iter().enumerate() {
            if is_blank {
                blank_run += 1;
                if blank_run == gap {
                    // 区切りが確定したので、進行中の帯を閉じる
                    if let Some(start) = band_start.take() {
                        let end = i - blank_run;
                        bands.push((start as u32, end as u32));
                    }
                }
            } else {
                if band_start.is_none() {
                    band_start = Some(i);
                }
                blank_run = 0;
            }
        }

        if let Some(start) = band_start {
            // 末尾の帯を閉じる（末尾の空行は帯に含めない）
            let mut end = blank.len() - 1;
            while end > start && blank[end] {
                end -= 1;
            }
            bands.push((start as u32, end as u32));
        }

        bands
    }

    /// 指定範囲のマージ解決済みビューを生成
    ///
    /// 結合範囲内のすべてのセルに親セルの値を複製した矩形を返します。
    /// 元のグリッドは変更されません（読み取り時の実体化）。解決は
    /// 冪等です: 解決済みビューを再度解決しても結果は変わりません。
    pub fn resolve_rect(&self, range: CellRange) -> Vec<Vec<CellValue>> {
        let (rows, cols) = range.size();
        let mut resolved = vec![vec![CellValue::Empty; cols as usize]; rows as usize];

        for (r, resolved_row) in resolved.iter_mut().enumerate() {
            for (c, slot) in resolved_row.iter_mut().enumerate() {
                let coord = CellCoord::new(range.start.row + r as u32, range.start.col + c as u32);
                *slot = self.effective_value(coord).clone();
            }
        }

        resolved
    }
}
