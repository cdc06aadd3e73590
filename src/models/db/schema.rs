diesel::table! {
    /// 患者原始报告
    patient_reports (id) {
        id -> Uuid,
        patient_email -> Varchar,
        /// hex(keccak256(id:mpin))
        mpin_digest -> Varchar,
        report_type -> Varchar,
        report_content -> Text,
        test_date -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// 市场上的脱敏报告
    published_reports (id) {
        id -> Uuid,
        original_report_id -> Uuid,
        anonymized_content -> Text,
        report_type -> Varchar,
        test_date -> Timestamptz,
        published_at -> Timestamptz,
        title -> Varchar,
        description -> Nullable<Text>,
        /// 逗号分隔
        tags -> Nullable<Varchar>,
        is_active -> Bool,
        /// 价格（ETH）
        price_eth -> Numeric,
        seller_wallet -> Text,
    }
}

diesel::joinable!(published_reports -> patient_reports (original_report_id));
diesel::allow_tables_to_appear_in_same_query!(patient_reports, published_reports);
