use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IMasterChefV2 {
        function poolLength() external view returns (uint256);
        function lpToken(uint256 pid) external view returns (address);
        function poolInfo(uint256 pid) external view returns (
            uint256 accCakePerShare,
            uint256 lastRewardBlock,
            uint256 allocPoint,
            uint256 totalBoostedShare,
            bool isRegular
        );
        function totalRegularAllocPoint() external view returns (uint256);
        function totalSpecialAllocPoint() external view returns (uint256);
        function cakePerBlock(bool isRegular) external view returns (uint256);
    }
}
