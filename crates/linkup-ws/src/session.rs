pub struct Session {
    pub user_id: i64,
    pub session_id: String,
    pub sequence: u64,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            session_id: uuid::Uuid::new_v4().to_string(),
            sequence: 0,
        }
    }

    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}
