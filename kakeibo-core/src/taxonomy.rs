//! Default category taxonomy of the MoneyForward ME export, used as the classifier's
//! closed candidate lists.

pub const DEFAULT_MAJOR_CATEGORIES: &[&str] = &[
    "食費",
    "日用品",
    "趣味・娯楽",
    "交際費",
    "交通費",
    "衣服・美容",
    "健康・医療",
    "自動車",
    "教養・教育",
    "住まい",
    "水道・光熱費",
    "通信費",
    "保険",
    "税金",
    "現金・カード",
    "その他",
];

pub const DEFAULT_MINOR_CATEGORIES: &[&str] = &[
    "外食",
    "食料品",
    "コンビニ",
    "ドラッグストア",
    "本",
    "映画・音楽",
    "旅行",
    "交際",
    "電車",
    "ガソリン",
    "衣服",
    "美容院",
    "病院",
    "歯医者",
    "学費",
    "家賃",
    "電気代",
    "水道代",
    "スマホ",
    "インターネット",
    "生命保険",
    "住民税",
    "現金引き出し",
    "クレジットカード",
    "未分類",
];
