pub trait ObjectStore {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String>;
    fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String>;
    /// Time-limited GET URL another service can fetch the object through.
    fn presigned_read_url(&self, bucket: &str, key: &str) -> Result<String, String>;
}
