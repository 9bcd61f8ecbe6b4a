use client::BatchParams;

pub async fn upload_batch(params: BatchParams) {
    client::upload_batch(params).await;
}
